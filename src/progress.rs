//! Progress display for chart scans
//!
//! Provides visual feedback while applications are checked using indicatif.
//! The handle is cheap to clone so each worker can advance the same bar.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Progress reporter for the scan workflow
#[derive(Clone, Default)]
pub struct Progress {
    /// Current progress bar, `None` when disabled
    bar: Option<ProgressBar>,
}

impl Progress {
    /// Start a progress bar on stderr for `total` applications
    pub fn start(enabled: bool, total: u64, message: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({eta})")
            .map(|style| style.progress_chars("█▓▒░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    /// Create a disabled progress reporter
    pub fn disabled() -> Self {
        Self { bar: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.bar.is_some()
    }

    /// Increment progress by one
    pub fn inc(&self) {
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    /// Update the message
    pub fn set_message(&self, message: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(message.to_string());
        }
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
