// src/progress.rs

//! Shared progress tracking trait and implementations
//!
//! The conversion engine reports progress as a percentage (`0..=100`) and a
//! phase message through the `ProgressTracker` trait. Implementations cover
//! the different output modes:
//! - `CliProgress`: Visual progress bar using indicatif
//! - `LogProgress`: Logs progress to tracing
//! - `CallbackProgress`: Forwards events to a closure (embedding, tests)
//! - `SilentProgress`: No-op for scripted/quiet modes
//!
//! # Example
//!
//! ```ignore
//! use extconv::progress::{CliProgress, ProgressTracker};
//!
//! let progress = CliProgress::new("foo.crx");
//! engine.submit(bytes, "foo.crx", &progress);
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{info, warn};

/// Core trait for progress tracking
///
/// Implementations should be thread-safe (Send + Sync) so a tracker can be
/// shared with the thread that cancels a job.
pub trait ProgressTracker: Send + Sync {
    /// Set the current status message
    fn set_message(&self, message: &str);

    /// Increment progress by the given amount
    fn increment(&self, amount: u64);

    /// Set progress to a specific position
    fn set_position(&self, position: u64);

    /// Set the total (length) of the progress
    fn set_length(&self, length: u64);

    /// Get current position
    fn position(&self) -> u64;

    /// Get total length
    fn length(&self) -> u64;

    /// Finish progress successfully with a message
    fn finish_with_message(&self, message: &str);

    /// Finish progress with an error/abandonment message
    fn finish_with_error(&self, message: &str);

    /// Check if progress is finished
    fn is_finished(&self) -> bool;
}

/// Silent progress tracker (no-op)
///
/// Use this for quiet mode, scripted usage, or when progress output
/// is not desired.
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

impl SilentProgress {
    /// Create a new silent progress tracker
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for SilentProgress {
    fn set_message(&self, _message: &str) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn set_position(&self, position: u64) {
        self.position.store(position, Ordering::Relaxed);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn finish_with_error(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Logging progress tracker
///
/// Logs progress updates to tracing at info level, roughly every
/// `log_interval` units. Useful for non-interactive environments.
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
    log_interval: u64,
}

impl LogProgress {
    /// Create a new logging progress tracker
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: AtomicU64::new(0),
            length: AtomicU64::new(100),
            finished: AtomicBool::new(false),
            log_interval: 25,
        }
    }

    /// Set the logging interval
    pub fn with_log_interval(mut self, interval: u64) -> Self {
        self.log_interval = interval.max(1);
        self
    }

    fn log_crossing(&self, old_pos: u64, new_pos: u64) {
        let length = self.length.load(Ordering::Relaxed);
        if length > 0 && new_pos / self.log_interval > old_pos / self.log_interval {
            let percent = (new_pos.min(length) * 100) / length;
            info!("{}: {}%", self.name, percent);
        }
    }
}

impl ProgressTracker for LogProgress {
    fn set_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }

    fn increment(&self, amount: u64) {
        let old_pos = self.position.fetch_add(amount, Ordering::Relaxed);
        self.log_crossing(old_pos, old_pos + amount);
    }

    fn set_position(&self, position: u64) {
        let old_pos = self.position.swap(position, Ordering::Relaxed);
        self.log_crossing(old_pos, position);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        info!("{}: {}", self.name, message);
    }

    fn finish_with_error(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        warn!("{}: ERROR - {}", self.name, message);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Callback-based progress tracker
///
/// Calls a user-provided function on progress updates.
pub struct CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    callback: F,
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

/// Events emitted by callback progress tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Message updated
    Message(String),
    /// Position changed
    Position { current: u64, total: u64 },
    /// Progress finished successfully
    Finished(String),
    /// Progress finished with error
    Error(String),
}

impl<F> CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    /// Create a new callback progress tracker
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            position: AtomicU64::new(0),
            length: AtomicU64::new(100),
            finished: AtomicBool::new(false),
        }
    }
}

impl<F> ProgressTracker for CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn set_message(&self, message: &str) {
        (self.callback)(ProgressEvent::Message(message.to_string()));
    }

    fn increment(&self, amount: u64) {
        let new_pos = self.position.fetch_add(amount, Ordering::Relaxed) + amount;
        let length = self.length.load(Ordering::Relaxed);
        (self.callback)(ProgressEvent::Position {
            current: new_pos,
            total: length,
        });
    }

    fn set_position(&self, position: u64) {
        self.position.store(position, Ordering::Relaxed);
        let length = self.length.load(Ordering::Relaxed);
        (self.callback)(ProgressEvent::Position {
            current: position,
            total: length,
        });
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        (self.callback)(ProgressEvent::Finished(message.to_string()));
    }

    fn finish_with_error(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        (self.callback)(ProgressEvent::Error(message.to_string()));
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Terminal progress bar for the CLI
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    /// Create a percentage bar labelled with the input name
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold} {msg:12} [{bar:40.cyan/blue}] {percent:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_prefix(label.to_string());
        Self { bar }
    }
}

impl ProgressTracker for CliProgress {
    fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    fn set_position(&self, position: u64) {
        self.bar.set_position(position);
    }

    fn set_length(&self, length: u64) {
        self.bar.set_length(length);
    }

    fn position(&self) -> u64 {
        self.bar.position()
    }

    fn length(&self) -> u64 {
        self.bar.length().unwrap_or(0)
    }

    fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    fn finish_with_error(&self, message: &str) {
        self.bar.abandon_with_message(format!("failed: {}", message));
    }

    fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}
