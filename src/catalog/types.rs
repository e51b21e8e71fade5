//! Catalog item types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric identity of a catalog item.
pub type TypeId = u64;

/// Metadata for a single catalog item.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ItemMeta {
    pub type_id: TypeId,
    pub name: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub base_price: Option<f64>,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

impl ItemMeta {
    /// Convenience constructor used by sources and tests.
    pub fn new(type_id: TypeId, name: impl Into<String>) -> Self {
        Self {
            type_id,
            name: name.into(),
            group: None,
            volume: 0.0,
            base_price: None,
            published: true,
        }
    }
}

/// Errors that can occur while building a new catalog snapshot.
#[derive(Debug, Error)]
pub enum SnapshotBuildError {
    /// Reading a local catalog file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote supplier could not be reached.
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote supplier answered with a non-success status.
    #[error("catalog supplier returned status {0}")]
    Status(u16),

    /// The payload was not a JSON item list.
    #[error("catalog payload is malformed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The supplier returned no items at all.
    #[error("catalog is empty")]
    Empty,

    /// Two items share one type id.
    #[error("type id {0} appears more than once")]
    DuplicateTypeId(TypeId),

    /// An item has a blank name.
    #[error("type id {0} has an empty name")]
    EmptyName(TypeId),

    /// A newer generation was installed while this one was being built.
    #[error("generation {offered} is not newer than current generation {current}")]
    Stale { offered: u64, current: u64 },
}

/// Result type for snapshot builds.
pub type BuildResult<T> = Result<T, SnapshotBuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_defaults() {
        let item: ItemMeta = serde_json::from_str(r#"{"type_id": 34, "name": "Tritanium"}"#).unwrap();
        assert_eq!(item, ItemMeta::new(34, "Tritanium"));
        assert!(item.published);
    }

    #[test]
    fn error_display() {
        assert_eq!(SnapshotBuildError::Status(503).to_string(), "catalog supplier returned status 503");
        assert_eq!(
            SnapshotBuildError::DuplicateTypeId(34).to_string(),
            "type id 34 appears more than once"
        );
    }
}
