//! push command - Upload files
//!
//! Uploads each file in turn and stops at the first failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use ut_core::{upload_batch, BatchObserver, Error, ProgressObserver, UploadReceipt};

use super::{describe_error, fail, open_session};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, TransferProgress};

/// Upload files
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Local files to upload, in order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

/// Execute the push command
pub async fn execute(args: PushArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config.clone());

    let (session, _) = match open_session() {
        Ok(s) => s,
        Err(e) => return fail(&formatter, &e),
    };

    let progress = Arc::new(TransferProgress::new(&output_config, ""));
    let mut reporter = PushReporter {
        formatter: &formatter,
        progress: progress.clone(),
    };
    let observer = progress.is_visible().then(|| progress.clone() as Arc<dyn ProgressObserver>);

    match upload_batch(&session, &args.files, &mut reporter, observer).await {
        Ok(summary) => {
            if formatter.is_json() {
                formatter.json(&summary);
            } else if summary.receipts.len() > 1 {
                formatter.success(&format!(
                    "All {} files uploaded successfully!",
                    summary.receipts.len()
                ));
            }
            ExitCode::Success
        }
        // Already reported by the observer
        Err(e) => ExitCode::from(&e),
    }
}

/// Prints batch progress the way `ut push` shows it
struct PushReporter<'a> {
    formatter: &'a Formatter,
    progress: Arc<TransferProgress>,
}

impl PushReporter<'_> {
    fn prefix(index: usize, total: usize) -> String {
        if total > 1 {
            format!("[{}/{}] ", index + 1, total)
        } else {
            String::new()
        }
    }
}

impl BatchObserver for PushReporter<'_> {
    fn on_start(&mut self, index: usize, total: usize, path: &Path) {
        let name = display_name(path);
        self.formatter.println(&format!(
            "{}Uploading {name}...",
            Self::prefix(index, total)
        ));
        self.progress.restart(&name);
    }

    fn on_success(&mut self, index: usize, total: usize, receipt: &UploadReceipt) {
        self.progress.finish_and_clear();
        self.formatter.success(&format!(
            "{}{} uploaded successfully!",
            Self::prefix(index, total),
            receipt.file_name
        ));
        self.formatter
            .println(&format!("  File Key: {}", receipt.file_key));
        if !receipt.file_url.is_empty() {
            self.formatter.println(&format!("  URL: {}", receipt.file_url));
        }
    }

    fn on_failure(&mut self, index: usize, total: usize, path: &Path, error: &Error) {
        self.progress.finish_and_clear();
        self.formatter.error(&format!(
            "{}Failed to upload {}: {}",
            Self::prefix(index, total),
            display_name(path),
            describe_error(error)
        ));
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
