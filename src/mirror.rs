//! Mirrors the catalog's folder tree onto local disk and finds missing files.
//!
//! The walk is an explicit worklist of `(children, base path)` frames, so it
//! is lazy: directories are created and existence is checked only as the
//! caller pulls the next [`PendingDownload`]. Order is depth-first in
//! catalog order.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use futures::{Stream, stream};

use crate::catalog::CatalogNode;
use crate::error::Result;
use crate::fs::FileSystem;
use crate::progress::{SkipReason, SyncProgress};

/// Keys that must never be synced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSet(HashSet<String>);

impl SkipSet {
    /// Creates an empty skip set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `key` is excluded.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    /// Number of excluded keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is excluded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SkipSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A file that is missing locally and should be acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDownload {
    /// Catalog key of the file.
    pub key: String,
    /// Local path the file will be written to.
    pub path: PathBuf,
}

/// Tallies of what the walk has seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorCounts {
    /// Directories ensured on disk.
    pub folders: usize,
    /// Files emitted as pending.
    pub queued: usize,
    /// Files that already existed locally.
    pub existing: usize,
    /// Entries dropped because of the skip list.
    pub excluded: usize,
}

/// Turns a catalog title into a single, safe path component.
#[must_use]
pub fn sanitize_component(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

struct Frame {
    nodes: std::vec::IntoIter<CatalogNode>,
    base: PathBuf,
}

/// Single-pass, forward-only walk over a catalog tree.
pub struct TreeMirror<'a, F: FileSystem> {
    stack: Vec<Frame>,
    skip: &'a SkipSet,
    fs: &'a F,
    progress: Arc<dyn SyncProgress>,
    counts: MirrorCounts,
}

impl<'a, F: FileSystem> TreeMirror<'a, F> {
    /// Prepares a walk of `nodes` rooted at `base`. Nothing touches the disk
    /// until [`next_pending`](Self::next_pending) is called.
    #[must_use]
    pub fn new(
        nodes: Vec<CatalogNode>,
        base: impl Into<PathBuf>,
        skip: &'a SkipSet,
        fs: &'a F,
        progress: Arc<dyn SyncProgress>,
    ) -> Self {
        Self {
            stack: vec![Frame {
                nodes: nodes.into_iter(),
                base: base.into(),
            }],
            skip,
            fs,
            progress,
            counts: MirrorCounts::default(),
        }
    }

    /// Returns what the walk has seen so far.
    #[must_use]
    pub const fn counts(&self) -> MirrorCounts {
        self.counts
    }

    /// Advances the walk to the next missing file.
    ///
    /// Returns `None` once the tree is exhausted. A directory that cannot be
    /// created is fatal: the error is yielded once and the walk ends.
    pub async fn next_pending(&mut self) -> Option<Result<PendingDownload>> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(node) = frame.nodes.next() else {
                self.stack.pop();
                continue;
            };
            let Some(title) = node.title() else {
                log::debug!("ignoring catalog entry of unknown type");
                continue;
            };
            let path = frame.base.join(sanitize_component(title));

            if let Some(key) = node.key()
                && self.skip.contains(key)
            {
                log::info!("[SKIP] {key}: skip list");
                self.counts.excluded += 1;
                self.progress.on_skipped(key, &SkipReason::Excluded);
                continue;
            }

            match node {
                CatalogNode::Folder { children, .. } => {
                    if let Err(e) = self.fs.create_dir_all(&path).await {
                        self.stack.clear();
                        return Some(Err(e.into()));
                    }
                    log::debug!("ensured directory {}", path.display());
                    self.counts.folders += 1;
                    self.stack.push(Frame {
                        nodes: children.into_iter(),
                        base: path,
                    });
                }
                CatalogNode::File { key, .. } => {
                    if self.fs.exists(&path).await {
                        log::info!("[SKIP] {key}: already exists at {}", path.display());
                        self.counts.existing += 1;
                        self.progress
                            .on_skipped(&key, &SkipReason::AlreadyExists(path));
                        continue;
                    }
                    log::info!("[QUEUE] {key}: {}", path.display());
                    self.counts.queued += 1;
                    let pending = PendingDownload { key, path };
                    self.progress.on_queued(&pending);
                    return Some(Ok(pending));
                }
                CatalogNode::Other => {}
            }
        }
    }

    /// Converts the walk into a lazy stream of pending downloads.
    pub fn into_stream(self) -> impl Stream<Item = Result<PendingDownload>> + 'a {
        stream::unfold(self, |mut walk| async move {
            walk.next_pending().await.map(|item| (item, walk))
        })
    }
}

/// Walks `nodes` under `base`, creating folders and yielding files that are
/// missing locally and not excluded by `skip`.
///
/// Re-invoking with the same arguments re-walks the tree and re-checks the disk.
pub fn mirror<'a, F: FileSystem>(
    nodes: Vec<CatalogNode>,
    base: impl Into<PathBuf>,
    skip: &'a SkipSet,
    fs: &'a F,
    progress: Arc<dyn SyncProgress>,
) -> impl Stream<Item = Result<PendingDownload>> + 'a {
    TreeMirror::new(nodes, base, skip, fs, progress).into_stream()
}
