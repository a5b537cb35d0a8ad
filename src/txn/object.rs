//! Atomic lifecycle word attached to every graph and schema entity.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::VersionId;

/// Lifecycle stage of an entity with respect to transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusFlag {
    /// Created by an in-flight writer; invisible to every reader.
    UncommittedCreate = 0,
    /// Creation committed at the stored version id.
    CommittedCreate = 1,
    /// Deleted by an in-flight writer; invisible to that writer.
    UncommittedDelete = 2,
    /// Deletion committed at the stored version id; awaiting reclamation.
    CommittedDelete = 3,
}

impl StatusFlag {
    fn from_bits(bits: u64) -> Self {
        match bits & STATUS_MASK {
            0 => StatusFlag::UncommittedCreate,
            1 => StatusFlag::CommittedCreate,
            2 => StatusFlag::UncommittedDelete,
            _ => StatusFlag::CommittedDelete,
        }
    }
}

const STATUS_MASK: u64 = 0b11;
const VERSION_SHIFT: u32 = 2;

fn pack(version_id: VersionId, status: StatusFlag) -> u64 {
    (version_id << VERSION_SHIFT) | status as u64
}

/// Packed `(version id, status)` word.
///
/// The version occupies the upper 62 bits, the status the low 2. A single
/// writer mutates the word (writer serialization is global), but readers
/// observe it concurrently, so every transition is a compare-and-swap.
#[derive(Debug)]
pub struct TxnObject {
    state: AtomicU64,
}

impl Default for TxnObject {
    fn default() -> Self {
        Self::new()
    }
}

impl TxnObject {
    /// Fresh lifecycle word: version 0, [`StatusFlag::UncommittedCreate`].
    pub fn new() -> Self {
        Self {
            state: AtomicU64::new(pack(0, StatusFlag::UncommittedCreate)),
        }
    }

    /// Lifecycle word restored from persisted state.
    pub fn committed_at(version_id: VersionId) -> Self {
        Self {
            state: AtomicU64::new(pack(version_id, StatusFlag::CommittedCreate)),
        }
    }

    /// Current `(version id, status)` pair.
    pub fn state(&self) -> (VersionId, StatusFlag) {
        let bits = self.state.load(Ordering::Acquire);
        (bits >> VERSION_SHIFT, StatusFlag::from_bits(bits))
    }

    /// Commit transition: `UncommittedCreate → CommittedCreate` and
    /// `UncommittedDelete → CommittedDelete`, stamping `version_id`. Other
    /// states are left unchanged. Returns the resulting status.
    pub fn promote(&self, version_id: VersionId) -> StatusFlag {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let next_status = match StatusFlag::from_bits(current) {
                StatusFlag::UncommittedCreate => StatusFlag::CommittedCreate,
                StatusFlag::UncommittedDelete => StatusFlag::CommittedDelete,
                other => return other,
            };
            match self.state.compare_exchange_weak(
                current,
                pack(version_id, next_status),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next_status,
                Err(observed) => current = observed,
            }
        }
    }

    /// Overwrites the status bits while keeping the stored version id.
    /// Used by rollback to revert an uncommitted delete.
    pub fn set_status(&self, status: StatusFlag) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let next = (current & !STATUS_MASK) | status as u64;
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Visibility gate for snapshot readers: true when a reader pinned at
    /// `snapshot` must not see this entity.
    pub fn is_invisible_to(&self, snapshot: VersionId) -> bool {
        let (version_id, status) = self.state();
        match status {
            StatusFlag::UncommittedCreate => true,
            StatusFlag::CommittedDelete => snapshot >= version_id,
            StatusFlag::CommittedCreate => snapshot < version_id,
            StatusFlag::UncommittedDelete => false,
        }
    }

    /// Visibility gate for the writer: true when the entity is deleted
    /// (pending or committed) and must not be seen.
    pub fn is_invisible_to_writer(&self) -> bool {
        matches!(
            self.state().1,
            StatusFlag::UncommittedDelete | StatusFlag::CommittedDelete
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MAX_VERSION_ID;

    #[test]
    fn promote_moves_uncommitted_states_forward() {
        let obj = TxnObject::new();
        assert_eq!(obj.promote(7), StatusFlag::CommittedCreate);
        assert_eq!(obj.state(), (7, StatusFlag::CommittedCreate));

        // A second promote of an already-committed entity is a no-op.
        assert_eq!(obj.promote(9), StatusFlag::CommittedCreate);
        assert_eq!(obj.state(), (7, StatusFlag::CommittedCreate));

        obj.set_status(StatusFlag::UncommittedDelete);
        assert_eq!(obj.promote(9), StatusFlag::CommittedDelete);
        assert_eq!(obj.state(), (9, StatusFlag::CommittedDelete));
    }

    #[test]
    fn set_status_keeps_the_version() {
        let obj = TxnObject::new();
        obj.promote(4);
        obj.set_status(StatusFlag::UncommittedDelete);
        assert_eq!(obj.state(), (4, StatusFlag::UncommittedDelete));
        obj.set_status(StatusFlag::CommittedCreate);
        assert_eq!(obj.state(), (4, StatusFlag::CommittedCreate));
    }

    #[test]
    fn reader_visibility_matrix() {
        let obj = TxnObject::new();
        assert!(obj.is_invisible_to(100));

        obj.promote(5);
        assert!(obj.is_invisible_to(4));
        assert!(!obj.is_invisible_to(5));
        assert!(!obj.is_invisible_to(6));

        obj.set_status(StatusFlag::UncommittedDelete);
        assert!(!obj.is_invisible_to(5));
        assert!(obj.is_invisible_to_writer());

        obj.promote(8);
        assert!(!obj.is_invisible_to(7));
        assert!(obj.is_invisible_to(8));
        assert!(obj.is_invisible_to(9));
    }

    #[test]
    fn packs_the_maximum_version() {
        let obj = TxnObject::new();
        obj.promote(MAX_VERSION_ID);
        assert_eq!(obj.state(), (MAX_VERSION_ID, StatusFlag::CommittedCreate));
    }
}
