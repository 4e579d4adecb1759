//! Remote file listing

use serde_json::json;

use crate::error::{Error, Result};
use crate::session::Session;
use crate::wire::FileListing;

/// Fetch the first page of files stored for the app
///
/// `has_more` is passed through untouched; callers only report it.
pub async fn list_files(session: &Session) -> Result<FileListing> {
    let response = session.call_api("listFiles", json!({})).await?;

    let listing: FileListing = serde_json::from_slice(&response.body)
        .map_err(|e| Error::MalformedResponse(format!("file listing response: {e}")))?;

    tracing::debug!(
        count = listing.files.len(),
        has_more = listing.has_more,
        "listed files"
    );
    Ok(listing)
}
