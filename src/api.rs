//! Client for the remote catalog service.
//!
//! Every request goes through one `reqwest::Client` whose bearer header is
//! fixed at construction; the same client is handed to the downloader.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;

use crate::catalog::{ActiveLink, ActiveLinks, CatalogNode};
use crate::error::{Error, Result};

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://dl-api.voorivex.academy";

const CATALOG_PATH: &str = "/video";
const REMOVE_PATH: &str = "/video/remove";
// Spelled this way on the server.
const GENERATE_PATH: &str = "/video/ganerate";
const ACTIVE_LINKS_PATH: &str = "/video/getActiveLink";

/// The three remote operations the sync depends on.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetches the full catalog tree.
    async fn fetch_catalog(&self) -> Result<Vec<CatalogNode>>;

    /// Discards any previously prepared artifact for `key`, then asks the
    /// service to generate a fresh one. Generation is never requested if the
    /// removal fails.
    async fn request_generation(&self, key: &str) -> Result<()>;

    /// Returns the links that are downloadable right now.
    async fn list_active_links(&self) -> Result<Vec<ActiveLink>>;
}

#[derive(Serialize)]
struct KeyRequest<'a> {
    key: &'a str,
}

/// HTTP implementation of [`CatalogApi`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for `base_url` that authenticates with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(base_url: impl Into<String>, token: &str) -> Result<Self> {
        Self::from_builder(reqwest::Client::builder(), base_url, token)
    }

    /// Like [`new`](Self::new), starting from a caller-tuned client builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn from_builder(
        builder: reqwest::ClientBuilder,
        base_url: impl Into<String>,
        token: &str,
    ) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = builder
            .default_headers(headers)
            .user_agent(concat!("voorisync/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns the authenticated HTTP client.
    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Returns the API base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_key(&self, path: &str, key: &str) -> Result<StatusCode> {
        let url = self.endpoint(path);
        log::debug!("POST {url} key={key}");
        let response = self
            .http
            .post(&url)
            .json(&KeyRequest { key })
            .send()
            .await?;
        Ok(response.status())
    }
}

#[async_trait]
impl CatalogApi for ApiClient {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogNode>> {
        let url = self.endpoint(CATALOG_PATH);
        log::debug!("GET {url}");
        let response = self.http.get(&url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(Error::CatalogFetch {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn request_generation(&self, key: &str) -> Result<()> {
        let status = self.post_key(REMOVE_PATH, key).await?;
        if status != StatusCode::CREATED {
            return Err(Error::Removal {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        let status = self.post_key(GENERATE_PATH, key).await?;
        if status != StatusCode::CREATED {
            return Err(Error::Generation {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn list_active_links(&self) -> Result<Vec<ActiveLink>> {
        let url = self.endpoint(ACTIVE_LINKS_PATH);
        log::debug!("GET {url}");
        let response = self.http.get(&url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(Error::ActiveLinkFetch {
                status: response.status().as_u16(),
            });
        }
        let links: ActiveLinks = response.json().await?;
        Ok(links.videos)
    }
}
