//! Reference data suppliers.
//!
//! A source returns a complete item list or fails. The hot-swap controller
//! treats every failure as "keep the current snapshot".

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use reqwest::StatusCode;

use crate::catalog::types::{BuildResult, ItemMeta, SnapshotBuildError};
use crate::config::CatalogSourceConfig;
use crate::store::LookupCache;

/// What one fetch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// A complete item list the origin served in full.
    Fresh(Vec<ItemMeta>),
    /// The origin reported no change; the items are the cached copy.
    Unchanged(Vec<ItemMeta>),
}

impl Fetched {
    pub fn into_items(self) -> Vec<ItemMeta> {
        match self {
            Fetched::Fresh(items) | Fetched::Unchanged(items) => items,
        }
    }
}

/// Supplier of complete catalogs.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch a complete item list.
    async fn fetch(&self) -> BuildResult<Fetched>;

    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}

/// Reads a JSON array of items from local disk.
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn fetch(&self) -> BuildResult<Fetched> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SnapshotBuildError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(Fetched::Fresh(serde_json::from_str(&content)?))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Fetches a JSON array of items over HTTP, revalidating with ETags.
#[derive(Clone)]
pub struct HttpCatalogSource {
    url: String,
    client: reqwest::Client,
    cache: LookupCache,
}

impl HttpCatalogSource {
    pub fn new(url: impl Into<String>, cache: LookupCache) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            client,
            cache,
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self) -> BuildResult<Fetched> {
        let cached = self.cache.get(&self.url);

        let mut request = self.client.get(&self.url);
        if let Some(etag) = cached.as_ref().and_then(|c| c.etag.as_deref()) {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            return match cached {
                Some(entry) => {
                    tracing::debug!(url = %self.url, "Catalog not modified, using cached body");
                    Ok(Fetched::Unchanged(serde_json::from_str(&entry.body)?))
                }
                None => Err(SnapshotBuildError::Status(status.as_u16())),
            };
        }
        if !status.is_success() {
            return Err(SnapshotBuildError::Status(status.as_u16()));
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        let items: Vec<ItemMeta> = serde_json::from_str(&body)?;

        self.cache.put(&self.url, etag, body);
        Ok(Fetched::Fresh(items))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Build the configured source.
pub fn source_from_config(config: &CatalogSourceConfig, cache: LookupCache) -> Arc<dyn CatalogSource> {
    match config {
        CatalogSourceConfig::File(path) => Arc::new(FileCatalogSource::new(path)),
        CatalogSourceConfig::Url(url) => Arc::new(HttpCatalogSource::new(url.clone(), cache)),
    }
}
