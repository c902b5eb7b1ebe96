//! Resource fetching abstraction for testability
//!
//! The engine never reads files or talks HTTP itself: it asks a
//! [`ResourceFetcher`] for a decoded [`FeatureCollection`] by relative path.
//! Every failure, whether transport or decoding, is reported as
//! [`LookupError::DataUnavailable`] so callers can retry later.

use crate::{FeatureCollection, LookupError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Trait for asynchronous GeoJSON fetching.
pub trait ResourceFetcher: Send + Sync {
    /// Fetches and decodes the collection at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Resource path relative to the fetcher's root
    fn fetch_json(&self, path: &str) -> impl Future<Output = Result<FeatureCollection>> + Send;
}

impl<T: ResourceFetcher> ResourceFetcher for Arc<T> {
    fn fetch_json(&self, path: &str) -> impl Future<Output = Result<FeatureCollection>> + Send {
        (**self).fetch_json(path)
    }
}

/// Decode a FeatureCollection body
pub(crate) fn decode_collection(path: &str, body: &[u8]) -> Result<FeatureCollection> {
    serde_json::from_slice(body).map_err(|e| LookupError::unavailable(path, e))
}

/// Reads collections from a local data directory.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    /// Creates a fetcher resolving paths under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl ResourceFetcher for FileFetcher {
    async fn fetch_json(&self, path: &str) -> Result<FeatureCollection> {
        let full_path = self.resolve(path);
        tracing::debug!("Reading {}", full_path.display());

        let body = tokio::fs::read(&full_path)
            .await
            .map_err(|e| LookupError::unavailable(path, e))?;
        decode_collection(path, &body)
    }
}

/// Fetches collections over HTTP below a base URL.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    /// Creates a fetcher with a 30 second request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, 30)
    }

    /// Creates a fetcher with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let base_url = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(concat!("parcel-locator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::unavailable(&base_url, e))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(feature = "http")]
impl ResourceFetcher for HttpFetcher {
    async fn fetch_json(&self, path: &str) -> Result<FeatureCollection> {
        let url = self.url(path);
        tracing::debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::unavailable(path, format!("request failed: {e}")))?;

        // Check HTTP status
        if !response.status().is_success() {
            return Err(LookupError::unavailable(
                path,
                format!("HTTP {} from {}", response.status(), url),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LookupError::unavailable(path, format!("failed to read response: {e}")))?;
        decode_collection(path, &body)
    }
}
