//! Terminal progress display for copy runs

use cfscopy_core::RunProgress;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner showing the entry currently being replicated
pub fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {prefix:.bold} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Update `pb` from a controller progress report
pub fn update(pb: &ProgressBar, progress: &RunProgress) {
    pb.set_prefix(progress_prefix(progress));
    pb.set_message(progress.current.display().to_string());
}

/// Counters shown in front of the current path
pub fn progress_prefix(progress: &RunProgress) -> String {
    format!(
        "{} dirs, {} files, {} skipped, {}",
        progress.directories_created,
        progress.files_copied,
        progress.skipped,
        format_size(progress.bytes_copied, BINARY)
    )
}
