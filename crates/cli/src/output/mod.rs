//! Output formatting utilities
//!
//! This module provides formatters for CLI output in both human-readable
//! and JSON formats. It also handles transfer progress and colored output.

mod formatter;
mod progress;

pub use formatter::Formatter;
pub use progress::TransferProgress;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress reporting
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

impl OutputConfig {
    /// Whether anything progress-related may be drawn
    pub fn allows_progress(&self) -> bool {
        !(self.quiet || self.json || self.no_progress)
    }
}
