//! Two-phase upload
//!
//! 1. Negotiation: the file's metadata is sent to `uploadFiles` and the service
//!    answers with a presigned target.
//! 2. Submission: the file is POSTed as multipart form data to the target URL,
//!    carrying every field of the target verbatim plus a `file` part.
//!
//! A target is used once, immediately after it is issued. Nothing is retried.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::{Error, Result};
use crate::outcome::{TransferOutcome, UploadReceipt};
use crate::planner::FileMetadata;
use crate::progress::{ProgressObserver, ProgressStream};
use crate::session::Session;
use crate::traits::{FilePart, UploadForm, UploadStream};
use crate::wire::{PresignedTarget, UploadFilesRequest, UploadFilesResponse};

/// Access control requested for every upload
pub const UPLOAD_ACL: &str = "public-read";

/// Content disposition requested for every upload
pub const CONTENT_DISPOSITION: &str = "inline";

/// Name of the multipart part carrying the file
pub const FILE_FIELD: &str = "file";

/// Size of the chunks the file body is streamed in
const CHUNK_SIZE: usize = 64 * 1024;

/// One file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub custom_id: Option<String>,
}

impl UploadRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            custom_id: None,
        }
    }
}

/// Upload one local file
pub async fn upload_file(
    session: &Session,
    request: &UploadRequest,
    progress: Option<Arc<dyn ProgressObserver>>,
) -> Result<UploadReceipt> {
    let started = Instant::now();
    session.secret()?;

    let mut file = tokio::fs::File::open(&request.path).await?;
    let stat = file.metadata().await?;
    let mut metadata = FileMetadata::from_fs(&request.path, &stat)?;
    metadata.custom_id = request.custom_id.clone();

    tracing::debug!(
        file = %metadata.name,
        size = metadata.size,
        mime = %metadata.mime_type,
        "requesting presigned target"
    );
    let target = negotiate(session, &metadata).await?;
    tracing::debug!(url = %target.url, key = %target.key, "presigned target issued");

    file.seek(SeekFrom::Start(0)).await?;
    let mut content = Vec::with_capacity(metadata.size as usize);
    file.read_to_end(&mut content).await?;
    drop(file);

    let bytes_transferred = content.len() as u64;
    submit(session, &target, &metadata, Bytes::from(content), progress).await?;

    tracing::debug!(key = %target.key, "upload complete");
    Ok(UploadReceipt {
        source: request.path.clone(),
        file_name: metadata.name,
        file_key: target.key,
        file_url: target.file_url,
        outcome: TransferOutcome {
            bytes_transferred,
            elapsed: started.elapsed(),
        },
    })
}

/// Exchange file metadata for a presigned target
///
/// Only the first target of the response is used.
pub async fn negotiate(session: &Session, metadata: &FileMetadata) -> Result<PresignedTarget> {
    let request = UploadFilesRequest {
        files: vec![metadata.clone()],
        acl: UPLOAD_ACL.to_string(),
        content_disposition: CONTENT_DISPOSITION.to_string(),
    };

    let response = session
        .call_api("uploadFiles", serde_json::to_value(&request)?)
        .await?;

    let decoded: UploadFilesResponse = serde_json::from_slice(&response.body)
        .map_err(|e| Error::MalformedResponse(format!("upload negotiation response: {e}")))?;

    if decoded.data.len() > 1 {
        tracing::debug!(count = decoded.data.len(), "several targets issued, using the first");
    }

    decoded
        .data
        .into_iter()
        .next()
        .ok_or_else(|| Error::MalformedResponse("no upload target issued".into()))
}

/// POST the file content to a presigned target
pub async fn submit(
    session: &Session,
    target: &PresignedTarget,
    metadata: &FileMetadata,
    content: Bytes,
    progress: Option<Arc<dyn ProgressObserver>>,
) -> Result<()> {
    let length = content.len() as u64;
    let chunks = futures::stream::iter(split_chunks(content));
    let body: UploadStream = match progress {
        Some(observer) => Box::pin(ProgressStream::new(chunks, Some(length), observer)),
        None => Box::pin(chunks),
    };

    let form = UploadForm {
        fields: target
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        file: FilePart {
            field_name: FILE_FIELD.to_string(),
            file_name: metadata.name.clone(),
            content_type: metadata.mime_type.clone(),
            length,
            body,
        },
    };

    let response = session.transport().post_form(&target.url, form).await?;
    if !response.is_success() {
        return Err(Error::RemoteApi {
            status: response.status,
            body: response.text(),
        });
    }

    Ok(())
}

fn split_chunks(content: Bytes) -> Vec<Result<Bytes>> {
    let mut chunks = Vec::with_capacity(content.len() / CHUNK_SIZE + 1);
    let mut offset = 0;
    while offset < content.len() {
        let end = (offset + CHUNK_SIZE).min(content.len());
        chunks.push(Ok(content.slice(offset..end)));
        offset = end;
    }
    chunks
}
