//! Maps of shared versioned cells, one and two key levels deep.

use std::hash::Hash;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::model::VersionId;
use crate::primitives::SpinRwLock;
use crate::version::VersionControl;

/// Hash map of keys to shared [`VersionControl`] cells.
#[derive(Debug)]
pub struct MultiVersionMap<K, T> {
    inner: SpinRwLock<FxHashMap<K, Arc<VersionControl<T>>>>,
}

impl<K, T> Default for MultiVersionMap<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> MultiVersionMap<K, T> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            inner: SpinRwLock::new(FxHashMap::default()),
        }
    }
}

impl<K: Eq + Hash + Copy, T: Clone> MultiVersionMap<K, T> {
    /// Stages `value` into the cell at `key`, creating the cell on first
    /// use, and returns the cell handle.
    pub fn insert(&self, key: K, value: T) -> Arc<VersionControl<T>> {
        let mut inner = self.inner.write();
        let cell = inner
            .entry(key)
            .or_insert_with(|| Arc::new(VersionControl::new()));
        cell.stage(value);
        Arc::clone(cell)
    }

    /// Latest value at `key` through the writer's eyes.
    pub fn find_latest(&self, key: &K) -> Option<T> {
        self.inner.read().get(key)?.read_latest()
    }

    /// Snapshot value at `key` as of `version_id`.
    pub fn find_at(&self, version_id: VersionId, key: &K) -> Option<T> {
        self.inner.read().get(key)?.read_at(version_id)
    }

    /// Shared handle of the cell at `key`.
    pub fn get(&self, key: &K) -> Option<Arc<VersionControl<T>>> {
        self.inner.read().get(key).cloned()
    }

    /// Marks the latest value at `key` as deleted. The cell stays in the
    /// map; physical removal happens through pruning.
    pub fn erase(&self, key: &K) {
        let inner = self.inner.write();
        if let Some(cell) = inner.get(key) {
            cell.delete_latest();
        }
    }

    /// Prunes one cell and drops it when nothing remains.
    ///
    /// A `base_version_id` of zero discards only the staged value (the
    /// rollback path); any other base prunes stable entries below it.
    /// Returns the number of keys still in the map.
    pub fn prune(&self, key: &K, base_version_id: VersionId) -> usize {
        let mut inner = self.inner.write();
        if let Some(cell) = inner.get(key).cloned() {
            let remaining = if base_version_id == 0 {
                cell.clear_staged()
            } else {
                cell.prune_stable_below(base_version_id)
            };
            if remaining == 0 {
                inner.remove(key);
            }
        }
        inner.len()
    }

    /// Prunes every cell below `base_version_id`, dropping emptied cells.
    /// Returns the number of keys still in the map.
    pub fn prune_all(&self, base_version_id: VersionId) -> usize {
        let mut inner = self.inner.write();
        inner.retain(|_, cell| cell.prune_stable_below(base_version_id) > 0);
        inner.len()
    }

    /// Keys currently indexed (in no particular order).
    pub fn keys(&self) -> Vec<K> {
        self.inner.read().keys().copied().collect()
    }

    /// Number of keys currently indexed.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether no key is indexed.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Two-level map of shared versioned cells: outer key, then inner key.
///
/// This is the adjacency container: the outer key is an edge-class id, the
/// inner key a position id, and the cell value a weak edge handle. Inner
/// maps empty out through pruning, at which point the outer key is erased.
#[derive(Debug)]
pub struct TwoLevelMultiVersionMap<K1, K2, T> {
    inner: SpinRwLock<FxHashMap<K1, MultiVersionMap<K2, T>>>,
}

impl<K1, K2, T> Default for TwoLevelMultiVersionMap<K1, K2, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K1, K2, T> TwoLevelMultiVersionMap<K1, K2, T> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            inner: SpinRwLock::new(FxHashMap::default()),
        }
    }
}

impl<K1, K2, T> TwoLevelMultiVersionMap<K1, K2, T>
where
    K1: Eq + Hash + Copy + Ord,
    K2: Eq + Hash + Copy + Ord,
    T: Clone,
{
    /// Stages `value` into the cell at `(key1, key2)` and returns the cell
    /// handle.
    pub fn insert(&self, key1: K1, key2: K2, value: T) -> Arc<VersionControl<T>> {
        let mut inner = self.inner.write();
        inner
            .entry(key1)
            .or_insert_with(MultiVersionMap::new)
            .insert(key2, value)
    }

    /// Latest value at `(key1, key2)` through the writer's eyes.
    pub fn find_latest(&self, key1: &K1, key2: &K2) -> Option<T> {
        self.inner.read().get(key1)?.find_latest(key2)
    }

    /// Snapshot value at `(key1, key2)` as of `version_id`.
    pub fn find_at(&self, version_id: VersionId, key1: &K1, key2: &K2) -> Option<T> {
        self.inner.read().get(key1)?.find_at(version_id, key2)
    }

    /// Shared handle of the cell at `(key1, key2)`.
    pub fn get(&self, key1: &K1, key2: &K2) -> Option<Arc<VersionControl<T>>> {
        self.inner.read().get(key1)?.get(key2)
    }

    /// Marks the latest value at `(key1, key2)` as deleted.
    pub fn erase(&self, key1: &K1, key2: &K2) {
        let inner = self.inner.write();
        if let Some(map) = inner.get(key1) {
            map.erase(key2);
        }
    }

    /// Prunes one cell (see [`MultiVersionMap::prune`]); an inner map that
    /// empties out takes its outer key with it.
    pub fn prune(&self, key1: &K1, key2: &K2, base_version_id: VersionId) {
        let mut inner = self.inner.write();
        let emptied = match inner.get(key1) {
            Some(map) => map.prune(key2, base_version_id) == 0,
            None => false,
        };
        if emptied {
            inner.remove(key1);
        }
    }

    /// Prunes every cell below `base_version_id`, cascading removal of
    /// emptied inner maps.
    pub fn prune_all(&self, base_version_id: VersionId) {
        let mut inner = self.inner.write();
        inner.retain(|_, map| map.prune_all(base_version_id) > 0);
    }

    /// Outer keys with their currently indexed inner keys, both sorted.
    pub fn keys(&self) -> Vec<(K1, Vec<K2>)> {
        let inner = self.inner.read();
        let mut out: Vec<(K1, Vec<K2>)> = inner
            .iter()
            .map(|(key1, map)| {
                let mut keys2 = map.keys();
                keys2.sort_unstable();
                (*key1, keys2)
            })
            .collect();
        out.sort_unstable_by_key(|(key1, _)| *key1);
        out
    }

    /// Inner keys indexed under one outer key, sorted.
    pub fn keys_of(&self, key1: &K1) -> Vec<K2> {
        let inner = self.inner.read();
        let mut keys2 = inner.get(key1).map(|map| map.keys()).unwrap_or_default();
        keys2.sort_unstable();
        keys2
    }
}
