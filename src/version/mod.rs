//! Multi-version value containers.
//!
//! A [`VersionControl`] cell holds one staged (unstable) write plus the
//! ordered log of committed (stable) versions. [`MultiVersionMap`] and
//! [`TwoLevelMultiVersionMap`] index shared cells by one or two keys, and
//! [`ConcurrentMap`] / [`ConcurrentDeleteQueue`] hold the global entity
//! tables and the deferred-reclamation queues.

mod cell;
mod concurrent;
mod map;

pub use cell::VersionControl;
pub use concurrent::{ConcurrentDeleteQueue, ConcurrentMap};
pub use map::{MultiVersionMap, TwoLevelMultiVersionMap};
