//! Transfer progress rendering
//!
//! The core meters bytes and decides when an update is due; this module only
//! draws. On a terminal that is an indicatif bar, otherwise one status line
//! per update on stderr.

use std::sync::{Mutex, MutexGuard};

use indicatif::{ProgressBar, ProgressStyle};
use ut_core::{ProgressObserver, ProgressSnapshot};

use super::OutputConfig;

const BAR_TEMPLATE: &str = "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} {bytes} ({bytes_per_sec})";

enum Sink {
    Hidden,
    Bar(ProgressBar),
    Lines,
}

/// Progress display for a single transfer
///
/// In quiet or JSON mode, or with `--no-progress`, nothing is drawn.
pub struct TransferProgress {
    sink: Mutex<Sink>,
}

impl TransferProgress {
    /// Pick a display for the current stderr
    pub fn new(config: &OutputConfig, label: &str) -> Self {
        if !config.allows_progress() {
            return Self::hidden();
        }
        if console::Term::stderr().is_term() {
            Self::bar(label)
        } else {
            Self::lines()
        }
    }

    pub fn hidden() -> Self {
        Self::with_sink(Sink::Hidden)
    }

    /// Plain status lines, one per update
    pub fn lines() -> Self {
        Self::with_sink(Sink::Lines)
    }

    fn bar(label: &str) -> Self {
        Self::with_sink(Sink::Bar(spinner(label)))
    }

    fn with_sink(sink: Sink) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    fn sink(&self) -> MutexGuard<'_, Sink> {
        self.sink.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check if anything will be drawn
    pub fn is_visible(&self) -> bool {
        !matches!(*self.sink(), Sink::Hidden)
    }

    /// Start over for the next file of a batch
    pub fn restart(&self, label: &str) {
        let mut sink = self.sink();
        match &*sink {
            Sink::Bar(bar) => bar.finish_and_clear(),
            Sink::Hidden | Sink::Lines => return,
        }
        *sink = Sink::Bar(spinner(label));
    }

    /// Remove the bar, e.g. after a failed transfer
    pub fn finish_and_clear(&self) {
        if let Sink::Bar(bar) = &*self.sink() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressObserver for TransferProgress {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        match &*self.sink() {
            Sink::Hidden => {}
            Sink::Lines => eprintln!("{}", render_line(snapshot)),
            Sink::Bar(bar) => {
                if let Some(total) = snapshot.total {
                    if bar.length() != Some(total) {
                        bar.set_style(style(BAR_TEMPLATE).progress_chars("#>-"));
                        bar.set_length(total);
                    }
                }
                bar.set_position(snapshot.so_far);
                if snapshot.finished {
                    bar.finish_and_clear();
                }
            }
        }
    }
}

fn spinner(label: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(style(SPINNER_TEMPLATE));
    bar.set_message(label.to_string());
    bar
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Status line for non-terminal output
pub fn render_line(snapshot: &ProgressSnapshot) -> String {
    let line = snapshot.to_string();
    if snapshot.finished {
        format!("{line} - done")
    } else {
        line
    }
}
