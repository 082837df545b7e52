//! Progress display for the packaging pipeline
//!
//! Writing the artifacts and zipping them each get one bar, labelled with the
//! step and advanced per file. `--no-progress` turns the bars off and the
//! writer falls back to one `Generated <file>` line per artifact.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

/// Packaging steps that report per-file progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Artifacts going into the staging directory
    Write,
    /// Staged files going into the archive
    Zip,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Step::Write => "Writing",
            Step::Zip => "Zipping",
        }
    }
}

/// Creates step bars, or nothing when progress is off
#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker {
    enabled: bool,
}

impl ProgressTracker {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Bar for `step` over `files` files; `None` when disabled or empty
    pub fn step(&self, step: Step, files: usize) -> Option<ProgressBar> {
        if !self.enabled || files == 0 {
            return None;
        }

        let pb = ProgressBar::new(files as u64);
        pb.set_style(
            ProgressStyle::with_template("{prefix:>8.cyan.bold} [{bar:25}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.set_prefix(step.label());

        debug!("{} {} files", step.label(), files);
        Some(pb)
    }

    /// Count one file done and show its name
    pub fn advance(pb: &Option<ProgressBar>, file_name: &str) {
        if let Some(progress) = pb {
            progress.set_message(file_name.to_string());
            progress.inc(1);
        }
    }

    /// Close the bar with a summary such as the archive name
    pub fn finish(pb: Option<ProgressBar>, summary: &str) {
        if let Some(progress) = pb {
            progress.finish_with_message(summary.to_string());
        }
    }

    /// Leave the bar where it stopped, naming the file that failed
    pub fn abandon(pb: Option<ProgressBar>, failed: &str) {
        if let Some(progress) = pb {
            progress.abandon_with_message(format!("failed on {}", failed));
        }
    }
}
