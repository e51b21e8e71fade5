//! Cache of remote lookups keyed by URL.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::store::{load_map, now_unix, save_map, StoreError};

/// A cached response body with its validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedLookup {
    /// Entity tag returned by the remote, if any.
    pub etag: Option<String>,
    /// Response body.
    pub body: String,
    /// When the entry was stored (seconds since epoch).
    pub stored_at: u64,
}

/// A thread-safe cache for remote lookups.
#[derive(Clone, Default)]
pub struct LookupCache {
    inner: Arc<DashMap<String, CachedLookup>>,
    persistence_path: Option<PathBuf>,
}

impl LookupCache {
    /// Create an in-memory cache.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path` if it exists; later flushes write back to it.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let map: HashMap<String, CachedLookup> = load_map(path)?;
        let inner = DashMap::with_capacity(map.len());
        for (k, v) in map {
            inner.insert(k, v);
        }
        tracing::info!(path = %path.display(), entries = inner.len(), "Lookup cache opened");
        Ok(Self {
            inner: Arc::new(inner),
            persistence_path: Some(path.to_path_buf()),
        })
    }

    pub fn get(&self, url: &str) -> Option<CachedLookup> {
        self.inner.get(url).map(|r| r.value().clone())
    }

    pub fn put(&self, url: &str, etag: Option<String>, body: String) {
        self.inner.insert(
            url.to_string(),
            CachedLookup {
                etag,
                body,
                stored_at: now_unix(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Persist to disk. A no-op for in-memory caches.
    pub fn flush(&self) -> Result<(), StoreError> {
        if let Some(path) = &self.persistence_path {
            let map: HashMap<_, _> = self
                .inner
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect();
            save_map(path, &map)?;
            tracing::info!(entries = map.len(), "Lookup cache flushed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get() {
        let cache = LookupCache::in_memory();
        assert!(cache.get("https://example.org").is_none());

        cache.put("https://example.org", Some("\"v1\"".into()), "[]".into());
        let hit = cache.get("https://example.org").unwrap();
        assert_eq!(hit.etag.as_deref(), Some("\"v1\""));
        assert_eq!(hit.body, "[]");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("httpcache.json");

        let cache = LookupCache::open(&path).unwrap();
        cache.put("u", None, "body".into());
        cache.flush().unwrap();

        let loaded = LookupCache::open(&path).unwrap();
        assert_eq!(loaded.get("u").unwrap().body, "body");
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("httpcache.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(LookupCache::open(&path), Err(StoreError::Corrupt { .. })));
    }
}
