use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Get a standardized spinner style for live sessions
pub fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} [{elapsed_precise}] {pos} frames | {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Spinner used by the console sink while a session publishes frames
pub fn session_spinner(prefix: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner()
        .with_style(progress_bar_style())
        .with_prefix(prefix.into());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
