//! Download statistics types.

use std::time::{Duration, Instant};

/// Statistics for a single file download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    /// Bytes written to disk.
    pub size: u64,
    /// Time spent streaming the file.
    pub elapsed: Duration,
    /// Average download speed in bytes per second.
    pub average_speed: u64,
    /// Peak download speed in bytes per second.
    pub peak_speed: u64,
}

/// Statistics for an entire sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Number of files downloaded during this run.
    pub files_downloaded: usize,
    /// Number of files skipped because they already existed locally.
    pub files_skipped: usize,
    /// Number of catalog entries excluded by the skip list.
    pub files_excluded: usize,
    /// Number of catalog folders ensured on disk.
    pub folders_mirrored: usize,
    /// Total bytes downloaded.
    pub total_bytes: u64,
    /// Highest speed any single file reached, in bytes per second.
    pub peak_speed: u64,
    /// Total elapsed time for the run.
    pub elapsed: Duration,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStats {
    /// Creates a new empty session stats.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            files_downloaded: 0,
            files_skipped: 0,
            files_excluded: 0,
            folders_mirrored: 0,
            total_bytes: 0,
            peak_speed: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Returns the average download speed in bytes per second.
    #[must_use]
    pub fn average_speed(&self) -> u64 {
        bytes_per_second(self.total_bytes, self.elapsed)
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn bytes_per_second(bytes: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes as f64 / secs) as u64
    } else {
        0
    }
}

/// Tracks one streaming download while it runs.
#[derive(Debug)]
pub struct DownloadStatsTracker {
    start_time: Instant,
    downloaded: u64,
    peak_speed: u64,
}

impl Default for DownloadStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadStatsTracker {
    /// Starts tracking now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            downloaded: 0,
            peak_speed: 0,
        }
    }

    /// Records written bytes and returns the current average speed (bytes/sec).
    pub fn record_bytes(&mut self, bytes: u64) -> u64 {
        self.downloaded = self.downloaded.saturating_add(bytes);
        let speed = bytes_per_second(self.downloaded, self.start_time.elapsed());
        self.peak_speed = self.peak_speed.max(speed);
        speed
    }

    /// Returns the cumulative number of bytes recorded.
    #[must_use]
    pub const fn downloaded(&self) -> u64 {
        self.downloaded
    }

    /// Converts this tracker into final file statistics.
    #[must_use]
    pub fn into_file_stats(self) -> FileStats {
        let elapsed = self.start_time.elapsed();
        FileStats {
            size: self.downloaded,
            elapsed,
            average_speed: bytes_per_second(self.downloaded, elapsed),
            peak_speed: self.peak_speed,
        }
    }
}

/// Builder for accumulating session statistics during a sync.
#[derive(Debug)]
pub struct SessionStatsBuilder {
    files_downloaded: usize,
    files_skipped: usize,
    files_excluded: usize,
    folders_mirrored: usize,
    total_bytes: u64,
    peak_speed: u64,
    start_time: Instant,
}

impl Default for SessionStatsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStatsBuilder {
    /// Creates a new session stats builder; the session clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            files_downloaded: 0,
            files_skipped: 0,
            files_excluded: 0,
            folders_mirrored: 0,
            total_bytes: 0,
            peak_speed: 0,
            start_time: Instant::now(),
        }
    }

    /// Sets the number of files that already existed locally.
    pub const fn set_skipped(&mut self, count: usize) {
        self.files_skipped = count;
    }

    /// Sets the number of entries excluded by the skip list.
    pub const fn set_excluded(&mut self, count: usize) {
        self.files_excluded = count;
    }

    /// Sets the number of folders ensured on disk.
    pub const fn set_folders(&mut self, count: usize) {
        self.folders_mirrored = count;
    }

    /// Records a completed file download.
    pub fn add_download(&mut self, file_stats: &FileStats) {
        self.files_downloaded += 1;
        self.total_bytes = self.total_bytes.saturating_add(file_stats.size);
        self.peak_speed = self.peak_speed.max(file_stats.peak_speed);
    }

    /// Builds the final session statistics.
    #[must_use]
    pub fn build(self) -> SessionStats {
        SessionStats {
            files_downloaded: self.files_downloaded,
            files_skipped: self.files_skipped,
            files_excluded: self.files_excluded,
            folders_mirrored: self.folders_mirrored,
            total_bytes: self.total_bytes,
            peak_speed: self.peak_speed,
            elapsed: self.start_time.elapsed(),
        }
    }
}
