//! Sequential multi-file upload
//!
//! Files go up one at a time in the order given. The first failure stops the
//! batch; nothing after it is attempted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::outcome::UploadReceipt;
use crate::progress::ProgressObserver;
use crate::session::Session;
use crate::upload::{upload_file, UploadRequest};

/// Per-item reporting hooks; `index` is zero-based
pub trait BatchObserver {
    fn on_start(&mut self, index: usize, total: usize, path: &Path);
    fn on_success(&mut self, index: usize, total: usize, receipt: &UploadReceipt);
    fn on_failure(&mut self, index: usize, total: usize, path: &Path, error: &Error);
}

/// All receipts of a fully successful batch, in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub receipts: Vec<UploadReceipt>,
}

impl BatchSummary {
    pub fn total_bytes(&self) -> u64 {
        self.receipts
            .iter()
            .map(|r| r.outcome.bytes_transferred)
            .sum()
    }
}

/// Upload every path in order, stopping at the first failure
pub async fn upload_batch(
    session: &Session,
    paths: &[PathBuf],
    observer: &mut dyn BatchObserver,
    progress: Option<Arc<dyn ProgressObserver>>,
) -> Result<BatchSummary> {
    if paths.is_empty() {
        return Err(Error::InvalidInput("no files to upload".into()));
    }

    let total = paths.len();
    let mut summary = BatchSummary::default();

    for (index, path) in paths.iter().enumerate() {
        observer.on_start(index, total, path);

        match upload_file(session, &UploadRequest::new(path), progress.clone()).await {
            Ok(receipt) => {
                observer.on_success(index, total, &receipt);
                summary.receipts.push(receipt);
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "batch stopped");
                observer.on_failure(index, total, path, &e);
                return Err(e);
            }
        }
    }

    Ok(summary)
}
