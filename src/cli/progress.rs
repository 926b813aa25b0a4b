//! CLI-specific progress handling for streetgauge
//!
//! Provides spinner implementation for the command-line interface.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Creates a spinner for long-running acquisition and analysis phases
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .expect("Failed to create progress style"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Progress manager for the analysis phases
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager with an initial phase message
    pub fn new(message: &str) -> Self {
        Self {
            pb: create_spinner(message),
        }
    }

    /// Switch the spinner to a new phase
    pub fn phase(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Stop the spinner and clear the line
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
