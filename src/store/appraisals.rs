//! Appraisal persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::LineItem;
use crate::store::{load_map, now_unix, save_map, StoreError};

/// A stored classification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAppraisal {
    pub id: Uuid,
    /// Seconds since epoch.
    pub created_at: u64,
    /// Recognizer that produced the items, `None` when nothing matched.
    pub recognizer: Option<String>,
    /// Catalog generation the text was classified against.
    pub generation: u64,
    pub items: Vec<LineItem>,
    pub unparsed_lines: Vec<(usize, String)>,
    pub raw_text: String,
}

/// A thread-safe appraisal store.
#[derive(Clone, Default)]
pub struct AppraisalStore {
    inner: Arc<DashMap<Uuid, StoredAppraisal>>,
    persistence_path: Option<PathBuf>,
}

impl AppraisalStore {
    /// Create an in-memory store.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path` if it exists; later flushes write back to it.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let map: HashMap<Uuid, StoredAppraisal> = load_map(path)?;
        let inner = DashMap::with_capacity(map.len());
        for (k, v) in map {
            inner.insert(k, v);
        }
        tracing::info!(path = %path.display(), appraisals = inner.len(), "Appraisal store opened");
        Ok(Self {
            inner: Arc::new(inner),
            persistence_path: Some(path.to_path_buf()),
        })
    }

    /// Store a new appraisal and return it with its assigned id.
    pub fn insert(
        &self,
        recognizer: Option<String>,
        generation: u64,
        items: Vec<LineItem>,
        unparsed_lines: Vec<(usize, String)>,
        raw_text: String,
    ) -> StoredAppraisal {
        let appraisal = StoredAppraisal {
            id: Uuid::new_v4(),
            created_at: now_unix(),
            recognizer,
            generation,
            items,
            unparsed_lines,
            raw_text,
        };
        self.inner.insert(appraisal.id, appraisal.clone());
        appraisal
    }

    pub fn get(&self, id: &Uuid) -> Option<StoredAppraisal> {
        self.inner.get(id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Persist to disk. A no-op for in-memory stores.
    pub fn flush(&self) -> Result<(), StoreError> {
        if let Some(path) = &self.persistence_path {
            let map: HashMap<_, _> = self
                .inner
                .iter()
                .map(|r| (*r.key(), r.value().clone()))
                .collect();
            save_map(path, &map)?;
            tracing::info!(appraisals = map.len(), "Appraisal store flushed");
        }
        Ok(())
    }
}
