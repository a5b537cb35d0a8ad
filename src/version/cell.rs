//! The versioned value cell.

use crate::model::VersionId;
use crate::primitives::SpinRwLock;

#[derive(Clone, Debug)]
struct Entry<T> {
    version_id: VersionId,
    active: bool,
    value: T,
}

#[derive(Debug)]
struct Inner<T> {
    stable: Vec<Entry<T>>,
    staged: Option<Entry<T>>,
}

/// A cell holding one pending write plus an ordered log of committed
/// versions.
///
/// The stable log is append-only and strictly ordered by version id; the
/// staged slot belongs to the single in-flight writer (writer serialization
/// is the context's job, not the cell's). Readers resolve against the log
/// only, writers read through the staged slot first.
#[derive(Debug)]
pub struct VersionControl<T> {
    inner: SpinRwLock<Inner<T>>,
}

impl<T> Default for VersionControl<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> VersionControl<T> {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            inner: SpinRwLock::new(Inner {
                stable: Vec::new(),
                staged: None,
            }),
        }
    }

    /// Creates a cell with `value` already staged.
    pub fn staged_with(value: T) -> Self {
        let cell = Self::new();
        cell.stage(value);
        cell
    }

    /// Stages `value` as the pending write, replacing any prior staged
    /// value of the same transaction.
    pub fn stage(&self, value: T) {
        let mut inner = self.inner.write();
        inner.staged = Some(Entry {
            version_id: 0,
            active: true,
            value,
        });
    }

    /// Discards the staged value without touching the stable log. This is
    /// rollback of a write.
    pub fn disable_staged(&self) {
        self.inner.write().staged = None;
    }

    /// Appends the staged value (if any) to the stable log at
    /// `version_id` and clears the staged slot. This is the commit step.
    pub fn promote(&self, version_id: VersionId) {
        let mut inner = self.inner.write();
        if let Some(mut staged) = inner.staged.take() {
            staged.version_id = version_id;
            inner.stable.push(staged);
        }
    }

    /// Erases stable entries with version id < `base_version_id`, always
    /// keeping the newest entry. A sole surviving entry that is inactive
    /// and older than the base empties the log entirely.
    ///
    /// Returns the number of values still held (stable entries plus the
    /// staged slot), letting the caller decide whether to drop the cell.
    pub fn prune_stable_below(&self, base_version_id: VersionId) -> usize {
        let mut inner = self.inner.write();
        if !inner.stable.is_empty() {
            let keep_from = inner.stable[..inner.stable.len() - 1]
                .iter()
                .take_while(|entry| entry.version_id < base_version_id)
                .count();
            inner.stable.drain(..keep_from);
            if inner.stable.len() == 1
                && inner.stable[0].version_id < base_version_id
                && !inner.stable[0].active
            {
                inner.stable.clear();
            }
        }
        inner.stable.len() + usize::from(inner.staged.is_some())
    }

    /// Discards the staged value and reports how many stable entries
    /// remain.
    pub fn clear_staged(&self) -> usize {
        let mut inner = self.inner.write();
        inner.staged = None;
        inner.stable.len()
    }
}

impl<T: Clone> VersionControl<T> {
    /// Marks the latest value as deleted.
    ///
    /// If nothing is staged, the most recent stable value is lifted into
    /// the staged slot first, so a later [`promote`](Self::promote) records
    /// the deletion in the stable log.
    pub fn delete_latest(&self) {
        let mut inner = self.inner.write();
        if inner.staged.is_none() {
            if let Some(value) = inner.stable.last().map(|last| last.value.clone()) {
                inner.staged = Some(Entry {
                    version_id: 0,
                    active: true,
                    value,
                });
            }
        }
        if let Some(staged) = inner.staged.as_mut() {
            staged.active = false;
        }
    }

    /// Latest value through the writer's eyes: the staged slot when
    /// present, otherwise the newest stable entry. `None` when the latest
    /// state is a deletion.
    pub fn read_latest(&self) -> Option<T> {
        let inner = self.inner.read();
        match &inner.staged {
            Some(staged) => staged.active.then(|| staged.value.clone()),
            None => inner
                .stable
                .last()
                .and_then(|last| last.active.then(|| last.value.clone())),
        }
    }

    /// The staged value, if one is present and not a deletion.
    pub fn staged_value(&self) -> Option<T> {
        let inner = self.inner.read();
        inner
            .staged
            .as_ref()
            .and_then(|staged| staged.active.then(|| staged.value.clone()))
    }

    /// The newest stable entry together with its active bit, ignoring the
    /// staged slot.
    pub fn latest_stable(&self) -> Option<(T, bool)> {
        let inner = self.inner.read();
        inner
            .stable
            .last()
            .map(|last| (last.value.clone(), last.active))
    }

    /// Snapshot read: the value of the greatest stable entry with version
    /// id ≤ `version_id`, or `None` if that entry is a deletion or no such
    /// entry exists. Never consults the staged slot.
    pub fn read_at(&self, version_id: VersionId) -> Option<T> {
        let inner = self.inner.read();
        inner
            .stable
            .iter()
            .rev()
            .find(|entry| entry.version_id <= version_id)
            .and_then(|entry| entry.active.then(|| entry.value.clone()))
    }
}
