//! Terminal values returned by successful transfers

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Bytes moved and time taken by one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub bytes_transferred: u64,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Result of a completed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    /// Local file that was sent
    pub source: PathBuf,
    pub file_name: String,
    /// Key assigned by the service
    pub file_key: String,
    /// Public URL of the stored file
    pub file_url: String,
    #[serde(flatten)]
    pub outcome: TransferOutcome,
}

/// Result of a completed download
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadReceipt {
    pub file_key: String,
    /// Where the file was written
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: TransferOutcome,
}
