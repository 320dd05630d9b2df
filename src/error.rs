//! Error types for the voorisync library.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while syncing the catalog.
#[derive(Error, Debug)]
pub enum Error {
    /// The catalog endpoint answered with something other than 200.
    #[error("could not fetch the video catalog (HTTP {status})")]
    CatalogFetch {
        /// Status code returned by the server.
        status: u16,
    },

    /// Removing the previously prepared file for a key failed.
    #[error("could not remove old prepared file for {key} (HTTP {status})")]
    Removal {
        /// Catalog key of the file.
        key: String,
        /// Status code returned by the server.
        status: u16,
    },

    /// Generating a fresh download artifact for a key failed.
    #[error("could not generate new file for {key} (HTTP {status})")]
    Generation {
        /// Catalog key of the file.
        key: String,
        /// Status code returned by the server.
        status: u16,
    },

    /// The active-links endpoint answered with something other than 200.
    #[error("could not fetch active links (HTTP {status})")]
    ActiveLinkFetch {
        /// Status code returned by the server.
        status: u16,
    },

    /// Received byte count differs from the declared content length.
    #[error("incomplete download of {}: received {received} of {expected} bytes", path.display())]
    IncompleteDownload {
        /// Local path that was being written.
        path: PathBuf,
        /// Declared content length.
        expected: u64,
        /// Bytes actually written.
        received: u64,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// I/O error during file or directory operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bearer credential cannot be sent as an HTTP header.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),

    /// Invalid configuration or sync root.
    #[error("configuration error: {0}")]
    Config(String),

    /// The sync was interrupted.
    #[error("sync interrupted")]
    Cancelled,
}

impl Error {
    /// Returns true if this error is the interrupt outcome rather than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A specialized `Result` type for voorisync operations.
pub type Result<T> = std::result::Result<T, Error>;
