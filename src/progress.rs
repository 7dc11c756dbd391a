//! Progress display for slow external calls
//!
//! Registry lookups and module installs can take a while, so a spinner is
//! shown on stderr while they run.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner for an indeterminate operation
pub struct Progress {
    /// Whether progress display is enabled (disabled in quiet and JSON mode)
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Show a spinner with a message
    pub fn spinner(&mut self, message: &str) {
        if !self.enabled {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg}")
                .expect("Invalid template"),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.bar = Some(spinner);
    }

    /// Finish and clear the spinner
    pub fn finish_and_clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_disabled() {
        let mut progress = Progress::disabled();
        progress.spinner("Installing 2 dependencies...");
        assert!(progress.bar.is_none());
        progress.finish_and_clear();
    }

    #[test]
    fn test_progress_enabled() {
        let mut progress = Progress::new(true);
        progress.spinner("Looking up published versions...");
        assert!(progress.bar.is_some());
        progress.finish_and_clear();
        assert!(progress.bar.is_none());
    }
}
