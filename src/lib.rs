//! voorisync - mirror a Voorivex video catalog onto local disk.
//!
//! The catalog's folders are recreated locally and every file that is
//! missing is acquired one at a time: the service is asked to prepare a
//! fresh download link, the active-link listing is polled until it shows up,
//! and the file is streamed to disk. An interrupt mid-download removes the
//! partial file.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use voorisync::{ApiClient, HttpDownloader, NoProgress, SyncOptions, Syncer, SyncProgress};
//!
//! # async fn example() -> voorisync::Result<()> {
//! let api = ApiClient::new(voorisync::DEFAULT_BASE_URL, "dl-token")?;
//! let downloader = HttpDownloader::new(api.http().clone(), voorisync::DEFAULT_CHUNK_SIZE);
//! let syncer = Syncer::new(api, downloader, SyncOptions::new("voorivex"));
//!
//! let progress: Arc<dyn SyncProgress> = Arc::new(NoProgress);
//! let stats = syncer.run(&progress, &CancellationToken::new()).await?;
//! println!("Downloaded {} files", stats.files_downloaded);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod acquire;
pub mod api;
pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod format;
pub mod fs;
pub mod mirror;
pub mod progress;
pub mod stats;
pub mod sync;
pub mod wait;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for convenience
pub use acquire::{Acquirer, AcquisitionState};
pub use api::{ApiClient, CatalogApi, DEFAULT_BASE_URL};
pub use catalog::{ActiveLink, CatalogNode};
pub use config::{AppConfig, SyncConfig};
pub use download::{DEFAULT_CHUNK_SIZE, DownloadOutcome, HttpDownloader, StreamDownload};
pub use error::{Error, Result};
pub use format::{format_bytes, format_duration};
pub use fs::{FileSystem, TokioFileSystem};
pub use mirror::{PendingDownload, SkipSet, TreeMirror, mirror};
pub use progress::{NoProgress, SkipReason, SyncProgress};
pub use stats::{FileStats, SessionStats};
pub use sync::{SyncOptions, Syncer};
