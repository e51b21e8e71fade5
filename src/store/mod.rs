//! Persistent stores.
//!
//! # Data Flow
//! ```text
//! appraisals.rs   POST /appraisal → insert → flushed to <db_path>/appraisals.json
//! lookup_cache.rs HttpCatalogSource → ETag + body → <db_path>/httpcache.json
//! ```
//!
//! # Design Decisions
//! - In-memory DashMap for concurrent access, JSON file for persistence
//! - Loaded once at startup, flushed when the resource ledger releases them
//! - Writes go to a temporary file first and are renamed into place

pub mod appraisals;
pub mod lookup_cache;

use std::collections::HashMap;
use std::fs::{self, File};
use std::hash::Hash;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use appraisals::{AppraisalStore, StoredAppraisal};
pub use lookup_cache::{CachedLookup, LookupCache};

/// Errors raised by the persistent stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Read a JSON map from `path`, or an empty map when the file does not exist.
pub(crate) fn load_map<K, V>(path: &Path) -> Result<HashMap<K, V>, StoreError>
where
    K: DeserializeOwned + Eq + Hash,
    V: DeserializeOwned,
{
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Corrupt {
        path: path.display().to_string(),
        source,
    })
}

/// Write a JSON map to `path` via a sibling temporary file.
pub(crate) fn save_map<K, V>(path: &Path, map: &HashMap<K, V>) -> Result<(), StoreError>
where
    K: Serialize + Eq + Hash,
    V: Serialize,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp).map_err(|e| io_error(&tmp, e))?;
        serde_json::to_writer(BufWriter::new(file), map).map_err(|source| StoreError::Corrupt {
            path: tmp.display().to_string(),
            source,
        })?;
    }
    fs::rename(&tmp, path).map_err(|e| io_error(path, e))
}

/// Seconds since the Unix epoch.
pub(crate) fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
