//! Observer hooks for rendering sync progress.

use std::path::{Path, PathBuf};

use crate::acquire::AcquisitionState;
use crate::mirror::PendingDownload;
use crate::stats::FileStats;

/// Why the mirror did not queue a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The key is on the skip list.
    Excluded,
    /// Something already exists at the target path.
    AlreadyExists(PathBuf),
}

/// Trait for receiving sync progress updates.
///
/// All methods have default no-op implementations, so an observer only
/// overrides the events it renders.
pub trait SyncProgress: Send + Sync {
    /// Called when the mirror passes over an entry without queueing it.
    fn on_skipped(&self, _key: &str, _reason: &SkipReason) {}

    /// Called when the mirror finds a file that is missing locally.
    fn on_queued(&self, _pending: &PendingDownload) {}

    /// Called on every acquisition state transition.
    fn on_state(&self, _key: &str, _state: AcquisitionState) {}

    /// Called after each poll that did not find an active link.
    fn on_wait(&self, _key: &str, _attempt: u32) {}

    /// Called when the byte stream starts. `size` is 0 when undeclared.
    fn on_file_start(&self, _path: &Path, _size: u64) {}

    /// Called with the number of bytes written since the last call.
    fn on_progress(&self, _path: &Path, _bytes_delta: u64) {}

    /// Called when a file has been fully written.
    fn on_file_complete(&self, _path: &Path, _stats: &FileStats) {}

    /// Called when acquiring a file fails.
    fn on_error(&self, _key: &str, _error: &str) {}
}

/// A progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl SyncProgress for NoProgress {}
