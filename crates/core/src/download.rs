//! Download by file key
//!
//! Public files are fetched straight from the file host. Private files first
//! go through `requestFileAccess`, which trades the key for a short-lived
//! signed URL. Either way the body is streamed into the destination file; a
//! failed transfer never leaves a partial file behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::outcome::{DownloadReceipt, TransferOutcome};
use crate::planner::{derive_filename, resolve_output_path};
use crate::progress::{ProgressObserver, ProgressStream};
use crate::session::Session;
use crate::traits::BodyStream;
use crate::wire::{FileAccessRequest, FileAccessResponse};

/// One file to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub file_key: String,
    /// Resolve through the signing exchange instead of the public URL
    pub private: bool,
    /// Output file or directory; empty means the current directory
    pub output: String,
}

/// Where a download comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub url: String,
    pub suggested_filename: String,
}

/// Turn a download request into a fetchable URL
pub async fn resolve_source(session: &Session, request: &DownloadRequest) -> Result<ResolvedSource> {
    let url = if request.private {
        request_file_access(session, &request.file_key).await?
    } else {
        session.endpoints().public_file(&request.file_key)
    };

    url::Url::parse(&url)?;

    Ok(ResolvedSource {
        url,
        suggested_filename: derive_filename(&request.file_key).to_string(),
    })
}

/// Exchange a file key for a signed URL
pub async fn request_file_access(session: &Session, file_key: &str) -> Result<String> {
    let body = serde_json::to_value(FileAccessRequest {
        file_key: file_key.to_string(),
    })?;
    let response = session.call_api("requestFileAccess", body).await?;

    let decoded: FileAccessResponse = serde_json::from_slice(&response.body)
        .map_err(|e| Error::MalformedResponse(format!("file access response: {e}")))?;

    match decoded.url {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(Error::MalformedResponse(
            "file access response has no url".into(),
        )),
    }
}

/// A download whose source and destination are settled
///
/// Nothing has been fetched or written yet; `fetch` does the transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDownload {
    pub file_key: String,
    pub url: String,
    pub path: PathBuf,
}

impl PreparedDownload {
    /// Name of the file being written, for display
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Stream the source into the destination
    pub async fn fetch(
        self,
        session: &Session,
        progress: Option<Arc<dyn ProgressObserver>>,
    ) -> Result<DownloadReceipt> {
        tracing::debug!(url = %self.url, path = %self.path.display(), "downloading");
        let started = Instant::now();
        let bytes_transferred = stream_to_file(session, &self.url, &self.path, progress).await?;

        Ok(DownloadReceipt {
            file_key: self.file_key,
            path: self.path,
            outcome: TransferOutcome {
                bytes_transferred,
                elapsed: started.elapsed(),
            },
        })
    }
}

/// Resolve the source URL and destination path of a download
///
/// When the destination exists and `force` is false, `confirm_overwrite` is
/// asked first; declining aborts with `Error::TransferAborted` before anything
/// is written.
pub async fn prepare_download<F>(
    session: &Session,
    request: &DownloadRequest,
    force: bool,
    confirm_overwrite: F,
) -> Result<PreparedDownload>
where
    F: FnOnce(&Path) -> bool,
{
    if request.file_key.trim().is_empty() {
        return Err(Error::InvalidInput("file key cannot be empty".into()));
    }

    let source = resolve_source(session, request).await?;
    let path = resolve_output_path(&source.suggested_filename, &request.output).await?;

    if !force && tokio::fs::try_exists(&path).await? && !confirm_overwrite(&path) {
        return Err(Error::TransferAborted(format!(
            "not overwriting {}",
            path.display()
        )));
    }

    Ok(PreparedDownload {
        file_key: request.file_key.clone(),
        url: source.url,
        path,
    })
}

/// Download one file: `prepare_download` followed by `PreparedDownload::fetch`
pub async fn download_file<F>(
    session: &Session,
    request: &DownloadRequest,
    force: bool,
    confirm_overwrite: F,
    progress: Option<Arc<dyn ProgressObserver>>,
) -> Result<DownloadReceipt>
where
    F: FnOnce(&Path) -> bool,
{
    prepare_download(session, request, force, confirm_overwrite)
        .await?
        .fetch(session, progress)
        .await
}

/// Stream a URL into `path`, removing the file again on any failure
pub async fn stream_to_file(
    session: &Session,
    url: &str,
    path: &Path,
    progress: Option<Arc<dyn ProgressObserver>>,
) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let result = copy_body(session, url, &mut file, progress).await;
    drop(file);

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove partial download");
        }
    }
    result
}

async fn copy_body(
    session: &Session,
    url: &str,
    file: &mut tokio::fs::File,
    progress: Option<Arc<dyn ProgressObserver>>,
) -> Result<u64> {
    let response = session.transport().get(url).await?;
    if response.status != 200 {
        let body = collect_text(response.body).await;
        return Err(Error::RemoteApi {
            status: response.status,
            body,
        });
    }

    let expected = response.content_length;
    let mut body: BodyStream = match progress {
        Some(observer) => Box::pin(ProgressStream::new(response.body, expected, observer)),
        None => response.body,
    };

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    if let Some(expected) = expected {
        if written != expected {
            return Err(Error::Network(format!(
                "connection closed after {written} of {expected} bytes"
            )));
        }
    }

    Ok(written)
}

async fn collect_text(mut body: BodyStream) -> String {
    let mut buf = Vec::new();
    while let Some(Ok(chunk)) = body.next().await {
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
