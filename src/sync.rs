//! Top-level sync: fetch the catalog, mirror it, acquire each missing file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::acquire::{Acquirer, DEFAULT_POLL_INTERVAL};
use crate::api::CatalogApi;
use crate::config::SyncConfig;
use crate::download::StreamDownload;
use crate::error::{Error, Result};
use crate::fs::{FileSystem, TokioFileSystem};
use crate::mirror::{SkipSet, TreeMirror};
use crate::progress::SyncProgress;
use crate::stats::{SessionStats, SessionStatsBuilder};
use crate::wait::until_cancelled;

/// What to sync and how.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Local directory the catalog is mirrored into.
    pub root: PathBuf,
    /// Keys that are never synced.
    pub skip: SkipSet,
    /// Wait between active-link polls.
    pub poll_interval: Duration,
}

impl SyncOptions {
    /// Options for `root` with an empty skip list and the default poll interval.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            skip: SkipSet::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Builds options from loaded configuration.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            root: config.root.clone(),
            skip: config.skip.iter().map(String::as_str).collect(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Sets the skip list.
    #[must_use]
    pub fn with_skip(mut self, skip: SkipSet) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Runs a full sync, one file at a time.
pub struct Syncer<A: CatalogApi, D: StreamDownload, F: FileSystem = TokioFileSystem> {
    api: A,
    downloader: D,
    fs: F,
    options: SyncOptions,
}

impl<A: CatalogApi, D: StreamDownload> Syncer<A, D> {
    /// Creates a syncer on the real file system.
    #[must_use]
    pub const fn new(api: A, downloader: D, options: SyncOptions) -> Self {
        Self::with_fs(api, downloader, options, TokioFileSystem)
    }
}

impl<A: CatalogApi, D: StreamDownload, F: FileSystem> Syncer<A, D, F> {
    /// Creates a syncer with a custom file system implementation.
    #[must_use]
    pub const fn with_fs(api: A, downloader: D, options: SyncOptions, fs: F) -> Self {
        Self {
            api,
            downloader,
            fs,
            options,
        }
    }

    /// Returns the sync options.
    #[must_use]
    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Fetches the catalog and acquires every missing file in catalog order.
    ///
    /// The first error ends the run; files already written stay in place.
    ///
    /// # Errors
    ///
    /// Any catalog, filesystem, acquisition error, or [`Error::Cancelled`].
    pub async fn run(
        &self,
        progress: &Arc<dyn SyncProgress>,
        cancel: &CancellationToken,
    ) -> Result<SessionStats> {
        let mut builder = SessionStatsBuilder::new();

        let catalog = until_cancelled(cancel, self.api.fetch_catalog()).await?;
        log::info!("catalog has {} top-level entries", catalog.len());

        let mut walk = TreeMirror::new(
            catalog,
            &self.options.root,
            &self.options.skip,
            &self.fs,
            Arc::clone(progress),
        );
        let acquirer = Acquirer::new(
            &self.api,
            &self.downloader,
            &self.fs,
            Arc::clone(progress),
            cancel.clone(),
        )
        .with_poll_interval(self.options.poll_interval);

        while let Some(pending) = walk.next_pending().await {
            let pending = pending?;
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let file_stats = acquirer.acquire(&pending).await?;
            builder.add_download(&file_stats);
        }

        let counts = walk.counts();
        builder.set_skipped(counts.existing);
        builder.set_excluded(counts.excluded);
        builder.set_folders(counts.folders);
        let stats = builder.build();
        log::info!(
            "sync finished: {} downloaded, {} already present, {} excluded",
            stats.files_downloaded,
            stats.files_skipped,
            stats.files_excluded
        );
        Ok(stats)
    }
}
