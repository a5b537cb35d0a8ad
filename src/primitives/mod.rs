//! Low-level building blocks shared by the versioned containers.

pub mod spin;

pub use spin::{SpinMutex, SpinMutexGuard, SpinRwLock, SpinRwReadGuard, SpinRwWriteGuard};
