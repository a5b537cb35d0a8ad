#![allow(unsafe_code)]

//! Busy-wait locks for the fine-grained per-cell critical sections.
//!
//! Readers never block writers for long here: every critical section is a
//! few loads or a small vector edit, so spinning beats parking. Each spin
//! loop performs a bounded busy-wait with a pause hint and, past
//! [`SPIN_LIMIT`] iterations, yields to the scheduler so a preempted lock
//! holder can make progress. The raw protocols are wrapped through
//! [`lock_api`] to get mandatory scoped guards.

use std::hint;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;

/// Busy-wait iterations before a spin loop starts yielding.
const SPIN_LIMIT: u32 = 1_000;

struct Backoff {
    spins: u32,
}

impl Backoff {
    const fn new() -> Self {
        Self { spins: 0 }
    }

    fn snooze(&mut self) {
        self.spins = self.spins.wrapping_add(1);
        if self.spins > SPIN_LIMIT {
            thread::yield_now();
        } else {
            hint::spin_loop();
        }
    }
}

/// Test-and-set spinlock behind [`lock_api::RawMutex`].
pub struct RawSpinLock {
    locked: AtomicBool,
}

unsafe impl lock_api::RawMutex for RawSpinLock {
    const INIT: Self = Self {
        locked: AtomicBool::new(false),
    };

    type GuardMarker = lock_api::GuardSend;

    fn lock(&self) {
        let mut backoff = Backoff::new();
        while !self.try_lock() {
            backoff.snooze();
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// Reader-writer spinlock behind [`lock_api::RawRwLock`].
///
/// Exclusive acquisition flips the `writing` flag, then waits for the
/// reader count to drain. Shared acquisition optimistically increments the
/// reader count and backs out if a writer slipped in between. No fairness
/// ordering is promised between waiting readers and writers.
pub struct RawRwSpinLock {
    readers: AtomicU32,
    writing: AtomicBool,
}

impl RawRwSpinLock {
    fn try_writer_flag(&self) -> bool {
        self.writing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }
}

unsafe impl lock_api::RawRwLock for RawRwSpinLock {
    const INIT: Self = Self {
        readers: AtomicU32::new(0),
        writing: AtomicBool::new(false),
    };

    type GuardMarker = lock_api::GuardSend;

    fn lock_shared(&self) {
        let mut backoff = Backoff::new();
        while !self.try_lock_shared() {
            backoff.snooze();
        }
    }

    fn try_lock_shared(&self) -> bool {
        if self.writing.load(Ordering::Acquire) {
            return false;
        }
        self.readers.fetch_add(1, Ordering::Acquire);
        if self.writing.load(Ordering::Acquire) {
            self.readers.fetch_sub(1, Ordering::Release);
            return false;
        }
        true
    }

    unsafe fn unlock_shared(&self) {
        self.readers.fetch_sub(1, Ordering::Release);
    }

    fn lock_exclusive(&self) {
        let mut backoff = Backoff::new();
        while !self.try_writer_flag() {
            backoff.snooze();
        }
        let mut backoff = Backoff::new();
        while self.readers.load(Ordering::Acquire) > 0 {
            backoff.snooze();
        }
    }

    fn try_lock_exclusive(&self) -> bool {
        if !self.try_writer_flag() {
            return false;
        }
        if self.readers.load(Ordering::Acquire) > 0 {
            self.writing.store(false, Ordering::Release);
            return false;
        }
        true
    }

    unsafe fn unlock_exclusive(&self) {
        self.writing.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.writing.load(Ordering::Relaxed) || self.readers.load(Ordering::Relaxed) > 0
    }
}

/// Mutex whose critical sections busy-wait instead of parking.
pub type SpinMutex<T> = lock_api::Mutex<RawSpinLock, T>;
/// Guard of a [`SpinMutex`].
pub type SpinMutexGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;

/// Reader-writer lock whose critical sections busy-wait instead of parking.
pub type SpinRwLock<T> = lock_api::RwLock<RawRwSpinLock, T>;
/// Shared guard of a [`SpinRwLock`].
pub type SpinRwReadGuard<'a, T> = lock_api::RwLockReadGuard<'a, RawRwSpinLock, T>;
/// Exclusive guard of a [`SpinRwLock`].
pub type SpinRwWriteGuard<'a, T> = lock_api::RwLockWriteGuard<'a, RawRwSpinLock, T>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn mutex_serializes_increments() {
        let counter = Arc::new(SpinMutex::new(0u64));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..1_000 {
                    *counter.lock() += 1;
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*counter.lock(), 8_000);
    }

    #[test]
    fn readers_share_while_writer_excludes() {
        let lock = Arc::new(SpinRwLock::new(Vec::<u32>::new()));

        let r1 = lock.read();
        let r2 = lock.read();
        assert!(lock.try_write().is_none());
        drop(r1);
        assert!(lock.try_write().is_none());
        drop(r2);

        let mut w = lock.try_write().expect("uncontended write");
        w.push(7);
        assert!(lock.try_read().is_none());
        drop(w);
        assert_eq!(*lock.read(), vec![7]);
    }

    #[test]
    fn writer_waits_for_reader_drain() {
        let lock = Arc::new(SpinRwLock::new(0u32));
        let reader = lock.read();

        let writer_lock = Arc::clone(&lock);
        let writer = thread::spawn(move || {
            let mut guard = writer_lock.write();
            *guard += 1;
        });

        thread::sleep(Duration::from_millis(20));
        drop(reader);
        writer.join().unwrap();
        assert_eq!(*lock.read(), 1);
    }

    #[test]
    fn concurrent_writers_exclude_each_other() {
        let lock = Arc::new(SpinRwLock::new(0u64));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let lock = Arc::clone(&lock);
            handles.push(thread::spawn(move || {
                for _ in 0..500 {
                    *lock.write() += 1;
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*lock.read(), 2_000);
    }
}
