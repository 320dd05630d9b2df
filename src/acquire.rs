//! Per-file acquisition: prepare, wait for the link, download, roll back on interrupt.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::CatalogApi;
use crate::catalog::ActiveLink;
use crate::download::{DownloadOutcome, StreamDownload};
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::mirror::PendingDownload;
use crate::progress::SyncProgress;
use crate::stats::FileStats;
use crate::wait::{poll_until, until_cancelled};

/// Default wait between active-link polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle of a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionState {
    /// Picked up, nothing sent yet.
    Queued,
    /// Asking the service to prepare a fresh artifact.
    Preparing,
    /// Waiting for the link to show up in the active listing.
    Polling,
    /// Streaming bytes to disk.
    Downloading,
    /// Written and verified.
    Done,
    /// Gave up; the error is propagated.
    Failed,
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Queued => "queued",
            Self::Preparing => "preparing",
            Self::Polling => "polling",
            Self::Downloading => "downloading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Drives one [`PendingDownload`] at a time through the acquisition states.
pub struct Acquirer<'a, A, D, F>
where
    A: CatalogApi + ?Sized,
    D: StreamDownload + ?Sized,
    F: FileSystem + ?Sized,
{
    api: &'a A,
    downloader: &'a D,
    fs: &'a F,
    progress: Arc<dyn SyncProgress>,
    cancel: CancellationToken,
    poll_interval: Duration,
}

impl<'a, A, D, F> Acquirer<'a, A, D, F>
where
    A: CatalogApi + ?Sized,
    D: StreamDownload + ?Sized,
    F: FileSystem + ?Sized,
{
    /// Creates an acquirer polling at [`DEFAULT_POLL_INTERVAL`].
    #[must_use]
    pub fn new(
        api: &'a A,
        downloader: &'a D,
        fs: &'a F,
        progress: Arc<dyn SyncProgress>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            downloader,
            fs,
            progress,
            cancel,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the wait between active-link polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn enter(&self, key: &str, state: AcquisitionState) {
        log::info!("{key}: {state}");
        self.progress.on_state(key, state);
    }

    fn fail(&self, key: &str, error: Error) -> Error {
        if !error.is_cancelled() {
            log::error!("{key}: {error}");
            self.enter(key, AcquisitionState::Failed);
            self.progress.on_error(key, &error.to_string());
        }
        error
    }

    /// Acquires one file end to end.
    ///
    /// Polling has no attempt limit; it ends when the link appears or the
    /// cancellation token fires. The preparation calls are abandoned as soon
    /// as the token fires. An interrupt during the download removes
    /// the partial file before [`Error::Cancelled`] is returned.
    ///
    /// # Errors
    ///
    /// Any preparation, listing or download error, or [`Error::Cancelled`].
    pub async fn acquire(&self, pending: &PendingDownload) -> Result<FileStats> {
        let key = pending.key.as_str();
        self.enter(key, AcquisitionState::Queued);

        self.enter(key, AcquisitionState::Preparing);
        if let Err(e) = until_cancelled(&self.cancel, self.api.request_generation(key)).await {
            return Err(self.fail(key, e));
        }

        self.enter(key, AcquisitionState::Polling);
        let link = match self.wait_for_link(key).await {
            Ok(link) => link,
            Err(e) => return Err(self.fail(key, e)),
        };

        self.enter(key, AcquisitionState::Downloading);
        let outcome = self
            .downloader
            .download(&link.url, &pending.path, &self.progress, &self.cancel)
            .await;
        match outcome {
            Ok(DownloadOutcome::Completed(stats)) => {
                self.enter(key, AcquisitionState::Done);
                Ok(stats)
            }
            Ok(DownloadOutcome::Cancelled { written }) => {
                log::info!("{key}: interrupted after {written} bytes, rolling back");
                self.rollback(&pending.path).await;
                Err(Error::Cancelled)
            }
            Err(e) => Err(self.fail(key, e)),
        }
    }

    async fn wait_for_link(&self, key: &str) -> Result<ActiveLink> {
        let api = self.api;
        let progress = &self.progress;
        poll_until(self.poll_interval, &self.cancel, |attempt| async move {
            let links = api.list_active_links().await?;
            let found = links.into_iter().find(|link| link.key == key);
            if found.is_none() {
                log::debug!("{key}: no active link yet (attempt {attempt})");
                progress.on_wait(key, attempt);
            }
            Ok(found)
        })
        .await
    }

    async fn rollback(&self, path: &Path) {
        if !self.fs.exists(path).await {
            return;
        }
        if let Err(e) = self.fs.remove_file(path).await {
            log::warn!("could not remove partial file {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogNode;
    use crate::fs::TokioFileSystem;
    use crate::progress::NoProgress;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const TICK: Duration = Duration::from_millis(1);

    /// Scripted catalog service recording every call.
    #[derive(Default)]
    struct MockApi {
        calls: Mutex<Vec<String>>,
        generation_error: Mutex<Option<Error>>,
        /// Generation never answers.
        generation_hangs: bool,
        /// Successive `list_active_links` answers; the last one repeats.
        listings: Mutex<VecDeque<Vec<ActiveLink>>>,
    }

    impl MockApi {
        fn with_listings(listings: Vec<Vec<ActiveLink>>) -> Self {
            Self {
                listings: Mutex::new(listings.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CatalogApi for MockApi {
        async fn fetch_catalog(&self) -> Result<Vec<CatalogNode>> {
            Ok(Vec::new())
        }

        async fn request_generation(&self, key: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("generate {key}"));
            if self.generation_hangs {
                std::future::pending::<()>().await;
            }
            self.generation_error.lock().unwrap().take().map_or(Ok(()), Err)
        }

        async fn list_active_links(&self) -> Result<Vec<ActiveLink>> {
            self.calls.lock().unwrap().push("list".to_string());
            let mut listings = self.listings.lock().unwrap();
            if listings.len() > 1 {
                Ok(listings.pop_front().unwrap_or_default())
            } else {
                Ok(listings.front().cloned().unwrap_or_default())
            }
        }
    }

    /// What the mock downloader does when invoked.
    enum Script {
        Complete(&'static [u8]),
        InterruptAfter(&'static [u8]),
        Fail,
    }

    struct MockDownloader {
        script: Script,
        urls: Mutex<Vec<String>>,
    }

    impl MockDownloader {
        fn new(script: Script) -> Self {
            Self {
                script,
                urls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl StreamDownload for MockDownloader {
        async fn download(
            &self,
            url: &str,
            path: &Path,
            _progress: &Arc<dyn SyncProgress>,
            _cancel: &CancellationToken,
        ) -> Result<DownloadOutcome> {
            self.urls.lock().unwrap().push(url.to_string());
            match self.script {
                Script::Complete(body) => {
                    std::fs::write(path, body)?;
                    Ok(DownloadOutcome::Completed(FileStats {
                        size: body.len() as u64,
                        elapsed: Duration::ZERO,
                        average_speed: 0,
                        peak_speed: 0,
                    }))
                }
                Script::InterruptAfter(partial) => {
                    std::fs::write(path, partial)?;
                    Ok(DownloadOutcome::Cancelled {
                        written: partial.len() as u64,
                    })
                }
                Script::Fail => {
                    std::fs::write(path, b"half")?;
                    Err(Error::IncompleteDownload {
                        path: path.to_path_buf(),
                        expected: 8,
                        received: 4,
                    })
                }
            }
        }
    }

    fn link(key: &str) -> ActiveLink {
        ActiveLink {
            key: key.to_string(),
            url: format!("https://cdn.example.test/{key}"),
        }
    }

    fn pending_in(dir: &TempDir) -> PendingDownload {
        PendingDownload {
            key: "k1".to_string(),
            path: dir.path().join("video.mp4"),
        }
    }

    fn acquirer<'a>(
        api: &'a MockApi,
        downloader: &'a MockDownloader,
        cancel: CancellationToken,
    ) -> Acquirer<'a, MockApi, MockDownloader, TokioFileSystem> {
        Acquirer::new(api, downloader, &TokioFileSystem, Arc::new(NoProgress), cancel)
            .with_poll_interval(TICK)
    }

    #[tokio::test]
    async fn downloads_once_link_is_active() {
        let dir = TempDir::new().unwrap();
        let pending = pending_in(&dir);
        let api = MockApi::with_listings(vec![
            vec![],
            vec![link("other")],
            vec![link("other"), link("k1")],
        ]);
        let downloader = MockDownloader::new(Script::Complete(b"video"));

        let stats = acquirer(&api, &downloader, CancellationToken::new())
            .acquire(&pending)
            .await
            .unwrap();

        assert_eq!(stats.size, 5);
        assert_eq!(std::fs::read(&pending.path).unwrap(), b"video");
        assert_eq!(api.calls(), vec!["generate k1", "list", "list", "list"]);
        assert_eq!(
            *downloader.urls.lock().unwrap(),
            vec!["https://cdn.example.test/k1".to_string()]
        );
    }

    #[tokio::test]
    async fn generation_failure_skips_polling() {
        let dir = TempDir::new().unwrap();
        let api = MockApi::with_listings(vec![vec![link("k1")]]);
        *api.generation_error.lock().unwrap() = Some(Error::Removal {
            key: "k1".to_string(),
            status: 500,
        });
        let downloader = MockDownloader::new(Script::Complete(b"video"));

        let err = acquirer(&api, &downloader, CancellationToken::new())
            .acquire(&pending_in(&dir))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Removal { status: 500, .. }));
        assert_eq!(api.calls(), vec!["generate k1"]);
        assert!(downloader.urls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_while_polling_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let pending = pending_in(&dir);
        let api = MockApi::with_listings(vec![vec![]]);
        let downloader = MockDownloader::new(Script::Complete(b"video"));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let acquirer = acquirer(&api, &downloader, cancel);
        let canceller = async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        };
        let (result, ()) = tokio::join!(acquirer.acquire(&pending), canceller);

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(!pending.path.exists());
        assert!(downloader.urls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_abandons_stalled_generation() {
        let dir = TempDir::new().unwrap();
        let pending = pending_in(&dir);
        let api = MockApi {
            generation_hangs: true,
            ..MockApi::with_listings(vec![vec![link("k1")]])
        };
        let downloader = MockDownloader::new(Script::Complete(b"video"));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let acquirer = acquirer(&api, &downloader, cancel);
        let canceller = async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        };
        let (result, ()) = tokio::join!(
            tokio::time::timeout(Duration::from_secs(5), acquirer.acquire(&pending)),
            canceller
        );

        let result = result.expect("cancellation ends the acquisition");
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(api.calls(), vec!["generate k1"]);
        assert!(downloader.urls.lock().unwrap().is_empty());
        assert!(!pending.path.exists());
    }

    #[tokio::test]
    async fn interrupted_download_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let pending = pending_in(&dir);
        let api = MockApi::with_listings(vec![vec![link("k1")]]);
        let downloader = MockDownloader::new(Script::InterruptAfter(b"partial"));

        let err = acquirer(&api, &downloader, CancellationToken::new())
            .acquire(&pending)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!pending.path.exists());
    }

    #[tokio::test]
    async fn failed_download_keeps_partial_file() {
        let dir = TempDir::new().unwrap();
        let pending = pending_in(&dir);
        let api = MockApi::with_listings(vec![vec![link("k1")]]);
        let downloader = MockDownloader::new(Script::Fail);

        let err = acquirer(&api, &downloader, CancellationToken::new())
            .acquire(&pending)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::IncompleteDownload { .. }));
        assert_eq!(std::fs::read(&pending.path).unwrap(), b"half");
    }

    #[derive(Default)]
    struct StateLog(Mutex<Vec<AcquisitionState>>);

    impl SyncProgress for StateLog {
        fn on_state(&self, _key: &str, state: AcquisitionState) {
            self.0.lock().unwrap().push(state);
        }
    }

    #[tokio::test]
    async fn walks_states_in_order() {
        let dir = TempDir::new().unwrap();
        let api = MockApi::with_listings(vec![vec![link("k1")]]);
        let downloader = MockDownloader::new(Script::Complete(b"v"));
        let log = Arc::new(StateLog::default());

        Acquirer::new(
            &api,
            &downloader,
            &TokioFileSystem,
            log.clone(),
            CancellationToken::new(),
        )
        .acquire(&pending_in(&dir))
        .await
        .unwrap();

        assert_eq!(
            *log.0.lock().unwrap(),
            vec![
                AcquisitionState::Queued,
                AcquisitionState::Preparing,
                AcquisitionState::Polling,
                AcquisitionState::Downloading,
                AcquisitionState::Done,
            ]
        );
    }

    #[test]
    fn state_labels() {
        assert_eq!(AcquisitionState::Polling.to_string(), "polling");
        assert_eq!(AcquisitionState::Failed.to_string(), "failed");
    }
}
