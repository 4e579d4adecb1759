//! REST API payloads
//!
//! Only the fields the client reads or writes are modelled; anything else the
//! service returns is ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::planner::FileMetadata;

/// Body of `POST /uploadFiles`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFilesRequest {
    pub files: Vec<FileMetadata>,
    pub acl: String,
    pub content_disposition: String,
}

/// Response of `POST /uploadFiles`
#[derive(Debug, Clone, Deserialize)]
pub struct UploadFilesResponse {
    pub data: Vec<PresignedTarget>,
}

/// A single-use upload destination issued by the service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedTarget {
    /// Where the multipart form is POSTed
    pub url: String,
    /// Form fields that must accompany the file, verbatim
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Key assigned to the stored file
    pub key: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    /// Public URL of the file once stored
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub content_disposition: String,
}

/// Body of `POST /requestFileAccess`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAccessRequest {
    pub file_key: String,
}

/// Response of `POST /requestFileAccess`
#[derive(Debug, Clone, Deserialize)]
pub struct FileAccessResponse {
    #[serde(default)]
    pub url: Option<String>,
}

/// Response of `POST /listFiles`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListing {
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub files: Vec<ListedFile>,
}

/// One remote file as reported by `listFiles`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedFile {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub key: String,
    /// Seconds since the Unix epoch
    #[serde(default)]
    pub uploaded_at: i64,
}
