//! ut-core: Core library for the ut file hosting CLI
//!
//! This crate provides the core functionality for the ut CLI, including:
//! - Configuration and credential management
//! - Upload, download and listing orchestrators
//! - Progress metering over byte streams
//! - The Transport trait the orchestrators are driven through
//!
//! This crate is designed to be independent of any specific HTTP client,
//! allowing the protocol logic to be tested against in-memory fakes.

pub mod batch;
pub mod config;
pub mod credential;
pub mod download;
pub mod error;
pub mod listing;
pub mod outcome;
pub mod planner;
pub mod progress;
pub mod session;
pub mod traits;
pub mod upload;
pub mod wire;

#[cfg(test)]
mod testing;

pub use batch::{upload_batch, BatchObserver, BatchSummary};
pub use config::{Config, ConfigManager, Endpoints};
pub use credential::{mask_secret, CachedCredential, ConfigCredentialProvider, CredentialProvider};
pub use download::{download_file, prepare_download, DownloadRequest, PreparedDownload};
pub use error::{Error, Result};
pub use listing::list_files;
pub use outcome::{DownloadReceipt, TransferOutcome, UploadReceipt};
pub use planner::{classify_content_type, derive_filename, resolve_output_path, FileMetadata};
pub use progress::{ProgressObserver, ProgressSnapshot, ProgressStream};
pub use session::Session;
pub use traits::Transport;
pub use upload::{upload_file, UploadRequest};
pub use wire::{FileListing, ListedFile};
