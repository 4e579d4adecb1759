//! Transport trait definition
//!
//! The orchestrators only need three HTTP shapes: a JSON POST to the API, a
//! multipart POST to a presigned target and a streaming GET. This trait keeps
//! the core independent of the HTTP client so it can be driven by fakes in
//! tests.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::Result;

/// Header carrying the secret API key on API calls
pub const API_KEY_HEADER: &str = "X-Uploadthing-Api-Key";

/// Deadline for metadata / API calls
pub const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for the upload submission call
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Request body stream handed to the transport
pub type UploadStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + Sync>>;

/// Response body stream handed back by the transport
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// JSON POST against the REST API
#[derive(Debug, Clone)]
pub struct JsonRequest {
    pub url: String,
    /// Sent as [`API_KEY_HEADER`] when present
    pub api_key: Option<String>,
    pub body: serde_json::Value,
}

/// Fully buffered response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text for diagnostics
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Multipart body for a presigned upload
pub struct UploadForm {
    /// Text fields, sent verbatim
    pub fields: Vec<(String, String)>,
    pub file: FilePart,
}

/// The file part of an [`UploadForm`]
pub struct FilePart {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub length: u64,
    pub body: UploadStream,
}

/// Streaming response of a download
pub struct DownloadResponse {
    pub status: u16,
    /// Content-Length, if the server sent one
    pub content_length: Option<u64>,
    pub body: BodyStream,
}

/// HTTP operations used by the transfer orchestrators
///
/// Implementations map connection and timeout failures to
/// `Error::Network` and return every HTTP status to the caller untouched.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body, bounded by [`API_TIMEOUT`]
    async fn post_json(&self, request: JsonRequest) -> Result<RawResponse>;

    /// POST a multipart form without credentials, bounded by [`SUBMIT_TIMEOUT`]
    async fn post_form(&self, url: &str, form: UploadForm) -> Result<RawResponse>;

    /// GET a URL without credentials and stream the body
    async fn get(&self, url: &str) -> Result<DownloadResponse>;
}
