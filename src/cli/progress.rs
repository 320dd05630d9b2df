//! Terminal rendering of sync progress and the end-of-run summary.

use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::{
    AcquisitionState, FileStats, PendingDownload, SessionStats, SkipReason, SyncProgress,
    format_bytes, format_duration,
};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates a byte progress bar for a single file download.
pub fn make_progress_bar(size: u64, name: &str) -> ProgressBar {
    let bar = if size == 0 {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::new(size)
    };
    let template = if size == 0 {
        "{spinner:.cyan} {bytes} @ {bytes_per_sec} - {msg}"
    } else {
        "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} @ {bytes_per_sec} - {msg}"
    };
    bar.set_style(
        ProgressStyle::with_template(template)
            .expect("progress template is valid")
            .progress_chars("━━╌"),
    );
    bar.set_message(name.to_string());
    bar
}

fn make_wait_spinner(key: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}").expect("spinner template is valid"),
    );
    spinner.set_message(format!("[WAIT] {key}"));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Renders sync events as coloured status lines plus one live bar.
pub struct CliProgress {
    multi: MultiProgress,
    bar: Mutex<Option<ProgressBar>>,
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl CliProgress {
    /// Creates a renderer drawing to stderr.
    #[must_use]
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bar: Mutex::new(None),
        }
    }

    fn line(&self, text: impl std::fmt::Display) {
        let _ = self.multi.println(text.to_string());
    }

    fn swap_bar(&self, next: Option<ProgressBar>) -> Option<ProgressBar> {
        let mut slot = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, next)
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let slot = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = slot.as_ref() {
            f(bar);
        }
    }

    /// Removes any live bar from the terminal.
    pub fn clear(&self) {
        if let Some(bar) = self.swap_bar(None) {
            bar.abandon();
        }
        let _ = self.multi.clear();
    }
}

impl SyncProgress for CliProgress {
    fn on_skipped(&self, key: &str, reason: &SkipReason) {
        let text = match reason {
            SkipReason::Excluded => format!("[SKIP] {key}: Skip List"),
            SkipReason::AlreadyExists(path) => {
                format!("[SKIP] {key}: Already Exist at {}", path.display())
            }
        };
        self.line(style(text).yellow());
    }

    fn on_queued(&self, pending: &PendingDownload) {
        self.line(style(format!("[QUEUE] {}: {}", pending.key, pending.path.display())).blue());
    }

    fn on_state(&self, key: &str, state: AcquisitionState) {
        match state {
            AcquisitionState::Queued => self.line(style(format!("[SYNC] {key}")).green()),
            AcquisitionState::Preparing => self.line(style(format!("[PREPARE] {key}")).blue()),
            AcquisitionState::Downloading => {
                if let Some(spinner) = self.swap_bar(None) {
                    spinner.finish_and_clear();
                }
                self.line(style(format!("[DOWNLOAD] {key}")).green());
            }
            AcquisitionState::Done => self.line(style(format!("[DONE] {key}")).green()),
            AcquisitionState::Polling | AcquisitionState::Failed => {}
        }
    }

    fn on_wait(&self, key: &str, attempt: u32) {
        if attempt == 0 {
            let spinner = self.multi.add(make_wait_spinner(key));
            if let Some(old) = self.swap_bar(Some(spinner)) {
                old.finish_and_clear();
            }
        } else {
            self.with_bar(|spinner| {
                spinner.set_message(format!("[WAIT] {key} ({} polls)", attempt + 1));
            });
        }
    }

    fn on_file_start(&self, path: &Path, size: u64) {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let bar = self.multi.add(make_progress_bar(size, &name));
        bar.enable_steady_tick(Duration::from_millis(250));
        if let Some(old) = self.swap_bar(Some(bar)) {
            old.finish_and_clear();
        }
    }

    fn on_progress(&self, _path: &Path, bytes_delta: u64) {
        self.with_bar(|bar| bar.inc(bytes_delta));
    }

    fn on_file_complete(&self, path: &Path, stats: &FileStats) {
        if let Some(bar) = self.swap_bar(None) {
            bar.finish_and_clear();
        }
        self.line(file_summary(path, stats));
    }

    fn on_error(&self, _key: &str, _error: &str) {
        if let Some(bar) = self.swap_bar(None) {
            bar.abandon();
        }
    }
}

fn file_summary(path: &Path, stats: &FileStats) -> String {
    format!(
        "  {} - {} in {} ({}/s avg, {}/s peak)",
        path.display(),
        format_bytes(stats.size),
        format_duration(stats.elapsed),
        format_bytes(stats.average_speed),
        format_bytes(stats.peak_speed),
    )
}

/// Prints a summary of the run.
pub fn print_summary(stats: &SessionStats) {
    println!("\n{SEPARATOR}");
    println!("Sync Summary");
    println!("{SEPARATOR}");
    println!("  Files downloaded:  {}", stats.files_downloaded);
    if stats.files_downloaded > 0 {
        println!("  Total size:        {}", format_bytes(stats.total_bytes));
        println!("  Average speed:     {}/s", format_bytes(stats.average_speed()));
        println!("  Peak speed:        {}/s", format_bytes(stats.peak_speed));
    }
    println!("  Folders mirrored:  {}", stats.folders_mirrored);
    println!("  Already present:   {}", stats.files_skipped);
    if stats.files_excluded > 0 {
        println!("  Excluded:          {}", stats.files_excluded);
    }
    println!("  Total time:        {}", format_duration(stats.elapsed));
    println!("{SEPARATOR}");
}
