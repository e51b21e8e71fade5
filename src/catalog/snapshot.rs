//! Immutable, versioned reference catalog.
//!
//! A snapshot is fully built before it is published and never changes
//! afterwards. Readers share it through `Arc`; the memory is released when
//! the last holder drops its reference.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::catalog::types::{BuildResult, ItemMeta, SnapshotBuildError, TypeId};

/// A complete generation of reference data.
#[derive(Debug)]
pub struct ReferenceSnapshot {
    generation: u64,
    created_at: SystemTime,
    items: HashMap<TypeId, ItemMeta>,
    /// Lowercased name → type id.
    by_name: HashMap<String, TypeId>,
    /// Lowercased names, longest first, for substring scans.
    names_by_length: Vec<(String, TypeId)>,
}

impl ReferenceSnapshot {
    /// Build a snapshot from a complete item list.
    ///
    /// Rejects empty catalogs, duplicate type ids and blank names so a
    /// malformed dump never becomes current.
    pub fn build(generation: u64, items: Vec<ItemMeta>) -> BuildResult<Self> {
        if items.is_empty() {
            return Err(SnapshotBuildError::Empty);
        }

        let mut by_id = HashMap::with_capacity(items.len());
        let mut by_name = HashMap::with_capacity(items.len());

        for item in items {
            let name = item.name.trim().to_lowercase();
            if name.is_empty() {
                return Err(SnapshotBuildError::EmptyName(item.type_id));
            }
            // First entry for a name wins.
            by_name.entry(name).or_insert(item.type_id);
            match by_id.entry(item.type_id) {
                Entry::Occupied(_) => return Err(SnapshotBuildError::DuplicateTypeId(item.type_id)),
                Entry::Vacant(slot) => {
                    slot.insert(item);
                }
            }
        }

        Ok(Self::assemble(generation, by_id, by_name))
    }

    /// The generation-zero placeholder used before the first successful build.
    pub fn empty() -> Self {
        Self::assemble(0, HashMap::new(), HashMap::new())
    }

    fn assemble(
        generation: u64,
        items: HashMap<TypeId, ItemMeta>,
        by_name: HashMap<String, TypeId>,
    ) -> Self {
        let mut names_by_length: Vec<(String, TypeId)> =
            by_name.iter().map(|(name, id)| (name.clone(), *id)).collect();
        // Ties broken by name so scans are deterministic.
        names_by_length.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Self {
            generation,
            created_at: SystemTime::now(),
            items,
            by_name,
            names_by_length,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Creation time as seconds since the Unix epoch.
    pub fn created_unix(&self) -> u64 {
        self.created_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by type id.
    pub fn get(&self, type_id: TypeId) -> Option<&ItemMeta> {
        self.items.get(&type_id)
    }

    /// Case-insensitive exact name lookup.
    pub fn find_by_name(&self, name: &str) -> Option<&ItemMeta> {
        let key = name.trim().to_lowercase();
        self.by_name.get(&key).and_then(|id| self.items.get(id))
    }

    /// Longest catalog name contained in `line`, compared case-insensitively.
    pub fn longest_name_in(&self, line: &str) -> Option<&ItemMeta> {
        let haystack = line.to_lowercase();
        self.names_by_length
            .iter()
            .find(|(name, _)| haystack.contains(name.as_str()))
            .and_then(|(_, id)| self.items.get(id))
    }
}

impl Drop for ReferenceSnapshot {
    fn drop(&mut self) {
        tracing::debug!(generation = self.generation, "Catalog snapshot released");
    }
}
