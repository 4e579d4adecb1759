//! Progress accounting for byte streams
//!
//! [`ProgressStream`] wraps any chunked byte stream, forwards every chunk
//! untouched and feeds its length to a [`ProgressMeter`]. The meter decides
//! when a status line is due and hands a [`ProgressSnapshot`] to a
//! [`ProgressObserver`], which does the actual rendering.
//!
//! A status line is due each time the running total crosses a multiple of
//! [`RENDER_INTERVAL`] and once more when the last byte arrives.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;

/// Bytes between two rendered status lines
pub const RENDER_INTERVAL: u64 = 102_400;

/// Receives status updates from a meter
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot);
}

/// Mutable state of one transfer's progress
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Expected size, 0 when unknown
    pub total: u64,
    pub so_far: u64,
    pub started_at: Instant,
}

/// Point-in-time view of a transfer
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub total: Option<u64>,
    pub so_far: u64,
    pub elapsed: Duration,
    pub finished: bool,
}

impl ProgressSnapshot {
    /// Completion percentage, when the total is known
    pub fn percentage(&self) -> Option<f64> {
        self.total
            .filter(|t| *t > 0)
            .map(|t| self.so_far as f64 / t as f64 * 100.0)
    }

    /// Average throughput since the transfer began
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.so_far as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let speed = self.bytes_per_sec() / 1024.0;
        match (self.percentage(), self.total) {
            (Some(pct), Some(total)) => write!(
                f,
                "Progress: {pct:.1}% ({}/{}) - {speed:.2} KB/s",
                format_bytes(self.so_far),
                format_bytes(total)
            ),
            _ => write!(
                f,
                "Transferred: {} - {speed:.2} KB/s",
                format_bytes(self.so_far)
            ),
        }
    }
}

fn format_bytes(n: u64) -> String {
    humansize::format_size(n, humansize::BINARY)
}

/// Counts bytes and decides when to render
#[derive(Debug)]
pub struct ProgressMeter {
    state: ProgressState,
    next_render: u64,
    final_rendered: bool,
}

impl ProgressMeter {
    /// Start a meter; `total` is the expected byte count if known
    pub fn new(total: Option<u64>) -> Self {
        Self {
            state: ProgressState {
                total: total.unwrap_or(0),
                so_far: 0,
                started_at: Instant::now(),
            },
            next_render: RENDER_INTERVAL,
            final_rendered: false,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Record `n` more bytes; returns whether a status line is due
    pub fn observe(&mut self, n: u64) -> bool {
        self.state.so_far += n;

        let mut due = false;
        if self.state.so_far >= self.next_render {
            self.next_render = (self.state.so_far / RENDER_INTERVAL + 1) * RENDER_INTERVAL;
            due = true;
        }
        if self.state.total > 0 && self.state.so_far >= self.state.total && !self.final_rendered {
            self.final_rendered = true;
            due = true;
        }
        due
    }

    /// Mark the end of the stream; returns whether a final line is still owed
    pub fn finish(&mut self) -> bool {
        let owed = !self.final_rendered;
        self.final_rendered = true;
        owed
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: Some(self.state.total).filter(|t| *t > 0),
            so_far: self.state.so_far,
            elapsed: self.state.started_at.elapsed(),
            finished: self.final_rendered,
        }
    }
}

/// Stream decorator that reports progress without touching the bytes
pub struct ProgressStream<S> {
    inner: S,
    meter: ProgressMeter,
    observer: Arc<dyn ProgressObserver>,
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, total: Option<u64>, observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            inner,
            meter: ProgressMeter::new(total),
            observer,
        }
    }

    pub fn meter(&self) -> &ProgressMeter {
        &self.meter
    }
}

impl<S, E> Stream for ProgressStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
{
    type Item = std::result::Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if this.meter.observe(chunk.len() as u64) {
                    this.observer.on_progress(&this.meter.snapshot());
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => {
                if this.meter.finish() {
                    this.observer.on_progress(&this.meter.snapshot());
                }
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
