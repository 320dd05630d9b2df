//! Streaming download of a resolved link to local disk.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::fs::{FileSystem, TokioFileSystem};
use crate::progress::SyncProgress;
use crate::stats::{DownloadStatsTracker, FileStats};

/// Default size of the write buffer between the network and the file.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// How a download attempt ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Every byte was written and the length check passed.
    Completed(FileStats),
    /// Cancellation fired mid-transfer. The partial file is left in place;
    /// removing it is the caller's job.
    Cancelled {
        /// Bytes written before the stop.
        written: u64,
    },
}

/// Streams a URL into a local file.
#[async_trait]
pub trait StreamDownload: Send + Sync {
    /// Downloads `url` to `path`, creating or overwriting the file.
    ///
    /// On failure other than cancellation the possibly incomplete file is
    /// left behind for inspection.
    async fn download(
        &self,
        url: &str,
        path: &Path,
        progress: &Arc<dyn SyncProgress>,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome>;
}

/// [`StreamDownload`] over HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpDownloader<F: FileSystem = TokioFileSystem> {
    http: reqwest::Client,
    fs: F,
    chunk_size: usize,
}

impl HttpDownloader<TokioFileSystem> {
    /// Creates a downloader sharing the given (authenticated) HTTP client.
    #[must_use]
    pub const fn new(http: reqwest::Client, chunk_size: usize) -> Self {
        Self::with_fs(http, chunk_size, TokioFileSystem)
    }
}

impl<F: FileSystem> HttpDownloader<F> {
    /// Creates a downloader with a custom file system implementation.
    #[must_use]
    pub const fn with_fs(http: reqwest::Client, chunk_size: usize, fs: F) -> Self {
        Self {
            http,
            fs,
            chunk_size,
        }
    }
}

#[async_trait]
impl<F: FileSystem> StreamDownload for HttpDownloader<F> {
    async fn download(
        &self,
        url: &str,
        path: &Path,
        progress: &Arc<dyn SyncProgress>,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome> {
        log::debug!("GET {url} -> {}", path.display());
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(DownloadOutcome::Cancelled { written: 0 }),
            response = self.http.get(url).send() => response?.error_for_status()?,
        };
        let total = response.content_length().unwrap_or(0);

        write_stream(
            &self.fs,
            response.bytes_stream(),
            total,
            path,
            self.chunk_size,
            progress,
            cancel,
        )
        .await
    }
}

/// Writes `body` to `path`, tracking bytes against the declared `total`.
///
/// A `total` of 0 means the length was not declared and is never checked.
///
/// # Errors
///
/// Returns [`Error::IncompleteDownload`] on a length mismatch, including a
/// body that fails before the declared length arrives. Otherwise the first
/// stream or I/O error.
pub async fn write_stream<F, S, E>(
    fs: &F,
    body: S,
    total: u64,
    path: &Path,
    chunk_size: usize,
    progress: &Arc<dyn SyncProgress>,
    cancel: &CancellationToken,
) -> Result<DownloadOutcome>
where
    F: FileSystem + ?Sized,
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Error>,
{
    let mut body = std::pin::pin!(body);
    let file = fs.create_file(path).await?;
    let mut writer = BufWriter::with_capacity(chunk_size.max(1), file);
    let mut tracker = DownloadStatsTracker::new();
    progress.on_file_start(path, total);

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Best effort: the caller is about to delete this file anyway.
                let _ = writer.flush().await;
                return Ok(DownloadOutcome::Cancelled { written: tracker.downloaded() });
            }
            next = body.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let e: Error = e.into();
                // Keep what arrived on disk for inspection.
                let _ = writer.flush().await;
                let received = tracker.downloaded();
                if total != 0 && received < total {
                    log::warn!("body of {} ended early: {e}", path.display());
                    return Err(Error::IncompleteDownload {
                        path: path.to_path_buf(),
                        expected: total,
                        received,
                    });
                }
                return Err(e);
            }
        };
        writer.write_all(&chunk).await?;
        tracker.record_bytes(chunk.len() as u64);
        progress.on_progress(path, chunk.len() as u64);
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;

    let received = tracker.downloaded();
    if total != 0 && received != total {
        return Err(Error::IncompleteDownload {
            path: path.to_path_buf(),
            expected: total,
            received,
        });
    }

    let stats = tracker.into_file_stats();
    progress.on_file_complete(path, &stats);
    Ok(DownloadOutcome::Completed(stats))
}
