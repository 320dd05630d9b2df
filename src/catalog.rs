//! Wire types for the remote catalog and the active-link listing.

use serde::{Deserialize, Serialize};

/// One entry of the remote catalog tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CatalogNode {
    /// A folder with ordered children.
    Folder {
        /// Display title, used as the directory name.
        title: String,
        /// Stable identifier.
        key: String,
        /// Child entries in catalog order.
        #[serde(default)]
        children: Vec<CatalogNode>,
    },
    /// A downloadable file.
    File {
        /// Display title, used as the file name.
        title: String,
        /// Stable identifier used in every API call about this file.
        key: String,
    },
    /// Any entry type this client does not know about.
    #[serde(other)]
    Other,
}

impl CatalogNode {
    /// Creates a folder node.
    #[must_use]
    pub fn folder(
        title: impl Into<String>,
        key: impl Into<String>,
        children: Vec<Self>,
    ) -> Self {
        Self::Folder {
            title: title.into(),
            key: key.into(),
            children,
        }
    }

    /// Creates a file node.
    #[must_use]
    pub fn file(title: impl Into<String>, key: impl Into<String>) -> Self {
        Self::File {
            title: title.into(),
            key: key.into(),
        }
    }

    /// Returns the node's key, if it has one.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Folder { key, .. } | Self::File { key, .. } => Some(key.as_str()),
            Self::Other => None,
        }
    }

    /// Returns the node's title, if it has one.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Folder { title, .. } | Self::File { title, .. } => Some(title.as_str()),
            Self::Other => None,
        }
    }
}

/// A currently downloadable, time-limited link for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLink {
    /// Catalog key the link belongs to.
    pub key: String,
    /// Resolved download URL.
    pub url: String,
}

/// Body of the active-links endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveLinks {
    /// Links that are downloadable right now.
    #[serde(default)]
    pub videos: Vec<ActiveLink>,
}
