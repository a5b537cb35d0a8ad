//! Global transaction counters and the active-reader set.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::{TxnId, VersionId};
use crate::primitives::SpinMutex;

/// Atomic counters for transaction and version ids plus the ordered set of
/// active readers with their pinned snapshots.
///
/// The active map is ordered by transaction id; because transaction ids
/// and snapshot versions are both allocated monotonically, its first entry
/// exposes the minimum snapshot any reader still pins.
#[derive(Debug)]
pub struct TxnStat {
    max_txn_id: AtomicU64,
    max_version_id: AtomicU64,
    active: SpinMutex<BTreeMap<TxnId, VersionId>>,
}

impl Default for TxnStat {
    fn default() -> Self {
        Self::new()
    }
}

impl TxnStat {
    /// Fresh counters: transaction ids start at 1, version ids at 0.
    pub fn new() -> Self {
        Self {
            max_txn_id: AtomicU64::new(1),
            max_version_id: AtomicU64::new(0),
            active: SpinMutex::new(BTreeMap::new()),
        }
    }

    /// Hands out the next transaction id.
    pub fn allocate_txn_id(&self) -> TxnId {
        self.max_txn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Advances the global version counter by one. Only the committing
    /// writer calls this, under the writer lock.
    pub fn advance_version_id(&self) -> VersionId {
        self.max_version_id.fetch_add(1, Ordering::AcqRel)
    }

    /// Most recently committed version id.
    pub fn max_version_id(&self) -> VersionId {
        self.max_version_id.load(Ordering::Acquire)
    }

    /// Continues a persisted version sequence after reopening.
    pub(crate) fn restore_version(&self, version_id: VersionId) {
        self.max_version_id.store(version_id, Ordering::Release);
    }

    /// Registers a reader with its pinned snapshot.
    pub fn register_active(&self, txn_id: TxnId, snapshot: VersionId) {
        self.active.lock().insert(txn_id, snapshot);
    }

    /// Removes a reader from the active set.
    pub fn unregister_active(&self, txn_id: TxnId) {
        self.active.lock().remove(&txn_id);
    }

    /// The oldest active reader and its snapshot, or `None` when no reader
    /// is active.
    pub fn min_active(&self) -> Option<(TxnId, VersionId)> {
        self.active
            .lock()
            .iter()
            .next()
            .map(|(txn_id, snapshot)| (*txn_id, *snapshot))
    }

    /// Whether `txn_id` is the oldest active reader and the only one
    /// pinning its snapshot (the next reader, if any, pins a strictly
    /// newer version). The reclamation path runs only when this holds for
    /// the reader that is exiting.
    pub fn is_pinned_min(&self, txn_id: TxnId) -> bool {
        let active = self.active.lock();
        let mut iter = active.iter();
        match iter.next() {
            Some((first_id, first_snapshot)) if *first_id == txn_id => match iter.next() {
                Some((_, next_snapshot)) => first_snapshot < next_snapshot,
                None => true,
            },
            _ => false,
        }
    }

    /// Number of active readers.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}
