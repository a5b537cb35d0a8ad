//! Spinlocked entity tables and deferred-reclamation queues.

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::model::VersionId;
use crate::primitives::SpinRwLock;

/// Hash map of shared entity handles keyed by identifier.
///
/// The map itself does not version anything: visibility is the handles'
/// responsibility. Lookups take the lock shared; inserts, erases and
/// clears take it exclusive.
#[derive(Debug)]
pub struct ConcurrentMap<K, V> {
    inner: SpinRwLock<FxHashMap<K, Arc<V>>>,
}

impl<K, V> Default for ConcurrentMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ConcurrentMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            inner: SpinRwLock::new(FxHashMap::default()),
        }
    }
}

impl<K: Eq + Hash + Copy, V> ConcurrentMap<K, V> {
    /// Inserts `value` under `key` unless the key is already present.
    pub fn insert(&self, key: K, value: Arc<V>) {
        self.inner.write().entry(key).or_insert(value);
    }

    /// Shared handle stored under `key`.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.inner.read().get(key).cloned()
    }

    /// Removes one key.
    pub fn erase(&self, key: &K) {
        self.inner.write().remove(key);
    }

    /// Removes a batch of keys under a single exclusive acquisition.
    pub fn erase_batch(&self, keys: &[K]) {
        let mut inner = self.inner.write();
        for key in keys {
            inner.remove(key);
        }
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Snapshot of all `(key, handle)` pairs.
    pub fn entries(&self) -> Vec<(K, Arc<V>)> {
        self.inner
            .read()
            .iter()
            .map(|(key, value)| (*key, Arc::clone(value)))
            .collect()
    }
}

/// Double-ended queue of `(key, version)` pairs in insertion order.
///
/// Writers append the entities they deleted, tagged with the commit
/// version; the reclamation path pops from the front while the tagged
/// version is within the safe bound.
#[derive(Debug)]
pub struct ConcurrentDeleteQueue<T> {
    inner: SpinRwLock<VecDeque<(T, VersionId)>>,
}

impl<T> Default for ConcurrentDeleteQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ConcurrentDeleteQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            inner: SpinRwLock::new(VecDeque::new()),
        }
    }

    /// Appends a batch of deletions.
    pub fn push_batch(&self, batch: impl IntoIterator<Item = (T, VersionId)>) {
        self.inner.write().extend(batch);
    }

    /// Pops and returns every front entry whose version is ≤ `version_id`.
    pub fn drain_up_to(&self, version_id: VersionId) -> Vec<T> {
        let mut inner = self.inner.write();
        let mut drained = Vec::new();
        while let Some(front) = inner.front() {
            if front.1 > version_id {
                break;
            }
            let (key, _) = inner.pop_front().expect("front just observed");
            drained.push(key);
        }
        drained
    }

    /// Number of queued deletions.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_first_binding() {
        let map = ConcurrentMap::new();
        map.insert(1u32, Arc::new("first"));
        map.insert(1u32, Arc::new("second"));
        assert_eq!(*map.get(&1).unwrap(), "first");
    }

    #[test]
    fn batch_erase_removes_all_given_keys() {
        let map = ConcurrentMap::new();
        for key in 0..5u32 {
            map.insert(key, Arc::new(key));
        }
        map.erase_batch(&[1, 3]);
        assert_eq!(map.len(), 3);
        assert!(map.get(&1).is_none());
        assert!(map.get(&3).is_none());
        assert!(map.get(&4).is_some());
    }

    #[test]
    fn drain_respects_version_bound_and_order() {
        let queue = ConcurrentDeleteQueue::new();
        queue.push_batch([("a", 2u64), ("b", 3), ("c", 5)]);
        assert_eq!(queue.drain_up_to(1), Vec::<&str>::new());
        assert_eq!(queue.drain_up_to(3), vec!["a", "b"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_up_to(u64::MAX), vec!["c"]);
        assert!(queue.is_empty());
    }
}
