//! fetch command - Download a file by key
//!
//! Public files come straight from the file host; `--private` goes through a
//! signed URL first and needs the API key.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use clap::Args;
use console::Term;
use serde::Serialize;
use ut_core::{prepare_download, DownloadReceipt, DownloadRequest, Error, ProgressObserver};

use super::{describe_error, open_session};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, TransferProgress};

/// Download a file
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// File key as printed by `ut push` or `ut list`
    pub file_key: String,

    /// Output file, or directory to save into
    #[arg(short, long, default_value = "")]
    pub output: String,

    /// Overwrite an existing file without asking
    #[arg(short, long)]
    pub force: bool,

    /// Show download progress
    #[arg(short, long)]
    pub progress: bool,

    /// The file is private; download through a signed URL
    #[arg(long)]
    pub private: bool,
}

#[derive(Debug, Serialize)]
struct FetchOutput<'a> {
    status: &'static str,
    #[serde(flatten)]
    receipt: &'a DownloadReceipt,
    size_human: String,
}

/// Execute the fetch command
pub async fn execute(args: FetchArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config.clone());

    let (session, config) = match open_session() {
        Ok(s) => s,
        Err(e) => return report(&formatter, &e),
    };

    let request = DownloadRequest {
        file_key: args.file_key.clone(),
        private: args.private,
        output: args.output.clone(),
    };

    // A prompt needs a human on the other end
    let interactive = !formatter.is_json() && std::io::stdin().is_terminal();
    let confirm = |path: &Path| interactive && confirm_overwrite(path);

    let prepared = match prepare_download(&session, &request, args.force, confirm).await {
        Ok(p) => p,
        Err(e) => return report(&formatter, &e),
    };
    let filename = prepared.filename();

    let show_progress = args.progress || config.defaults.progress;
    let progress = Arc::new(if show_progress {
        TransferProgress::new(&output_config, &filename)
    } else {
        TransferProgress::hidden()
    });
    let observer = progress
        .is_visible()
        .then(|| progress.clone() as Arc<dyn ProgressObserver>);

    formatter.println(&format!("Downloading {filename}..."));
    let result = prepared.fetch(&session, observer).await;
    progress.finish_and_clear();

    match result {
        Ok(receipt) => {
            let size_human =
                humansize::format_size(receipt.outcome.bytes_transferred, humansize::BINARY);
            if formatter.is_json() {
                formatter.json(&FetchOutput {
                    status: "success",
                    receipt: &receipt,
                    size_human,
                });
            } else {
                formatter.success(&format!(
                    "Downloaded {} to {} ({size_human} in {:.1}s)",
                    receipt.file_key,
                    receipt.path.display(),
                    receipt.outcome.elapsed.as_secs_f64()
                ));
            }
            ExitCode::Success
        }
        Err(e) => report(&formatter, &e),
    }
}

fn report(formatter: &Formatter, error: &Error) -> ExitCode {
    match error {
        Error::ConfigurationMissing(_) => formatter.error(
            "API key is not configured.\nRun 'ut config set-secret' before downloading private files.",
        ),
        Error::TransferAborted(_) => formatter.warning("Download cancelled."),
        Error::RemoteApi { status: 404, .. } => formatter.error("File not found."),
        other => formatter.error(&format!("Download failed: {}", describe_error(other))),
    }
    ExitCode::from(error)
}

fn confirm_overwrite(path: &Path) -> bool {
    let term = Term::stderr();
    let prompt = format!("File '{}' already exists. Overwrite? (y/N): ", path.display());
    if term.write_str(&prompt).is_err() {
        return false;
    }
    term.read_line()
        .map(|answer| is_yes(&answer))
        .unwrap_or(false)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
