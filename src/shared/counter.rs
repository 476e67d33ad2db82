//! # Shared counter.
//!
//! [`SharedCounter`] is an unsigned integer in shared memory guarded by its own
//! [`ProcessLock`]. Clones (and forked copies) point at the same value.
//!
//! ```text
//! owner ──new()──► SharedCounter ──clone──► producer worker(s)  (lock → += n)
//!                        └──────────clone──► renderer worker    (lock → read)
//! ```
//!
//! Every read and write takes the lock; there are no lock-free fast paths, so
//! a reader never observes a half-applied read-modify-write.

use std::fmt;
use std::io;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::warn;

use crate::shared::lock::{ProcessLock, ProcessLockGuard};
use crate::shared::segment::{Shared, Zeroable};

#[repr(C)]
struct CounterCell {
    lock: ProcessLock,
    value: AtomicU64,
    max: AtomicU64,
    has_max: AtomicBool,
}

// SAFETY: lock + atomics; zero means value 0, no maximum.
unsafe impl Zeroable for CounterCell {}

/// Cross-process, lock-guarded `u64`.
///
/// Create it **before** starting any worker that should share it.
///
/// # Example
/// ```
/// use loopvisor::SharedCounter;
///
/// let c = SharedCounter::new(0).unwrap();
/// *c.lock() += 5;
/// c.with_lock(|v| *v *= 2);
/// assert_eq!(c.get(), 10);
/// ```
#[derive(Clone)]
pub struct SharedCounter {
    cell: Arc<Shared<CounterCell>>,
}

impl SharedCounter {
    /// Creates a counter holding `initial`, without a maximum.
    pub fn new(initial: u64) -> io::Result<Self> {
        let cell = Arc::new(Shared::<CounterCell>::new()?);
        cell.value.store(initial, Ordering::Relaxed);
        Ok(Self { cell })
    }

    /// Creates a counter holding `initial` with a maximum hint.
    pub fn with_max(initial: u64, max: u64) -> io::Result<Self> {
        let counter = Self::new(initial)?;
        counter.set_max(Some(max));
        Ok(counter)
    }

    /// Returns a lock-guarded snapshot of the value.
    pub fn get(&self) -> u64 {
        *self.lock()
    }

    /// Replaces the value.
    pub fn set(&self, value: u64) {
        *self.lock() = value;
    }

    /// Adds `n`, saturating at `u64::MAX`, and returns the new value.
    pub fn inc(&self, n: u64) -> u64 {
        self.with_lock(|v| {
            *v = v.saturating_add(n);
            *v
        })
    }

    /// Locks the counter for a read-modify-write.
    ///
    /// The guard dereferences to the value; it is written back and the lock
    /// released when the guard drops, also during unwinding. A guard whose
    /// lock was revoked from under it discards its write.
    pub fn lock(&self) -> CounterGuard<'_> {
        let guard = self.cell.lock.lock();
        let value = self.cell.value.load(Ordering::Acquire);
        CounterGuard {
            cell: &self.cell,
            value,
            lock: guard,
        }
    }

    /// Runs `f` on the value while holding the lock.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut u64) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Returns the maximum hint, if any.
    pub fn max(&self) -> Option<u64> {
        let _guard = self.cell.lock.lock();
        self.cell
            .has_max
            .load(Ordering::Acquire)
            .then(|| self.cell.max.load(Ordering::Acquire))
    }

    /// Sets or clears the maximum hint.
    pub fn set_max(&self, max: Option<u64>) {
        let _guard = self.cell.lock.lock();
        self.cell.max.store(max.unwrap_or(0), Ordering::Release);
        self.cell.has_max.store(max.is_some(), Ordering::Release);
    }

    /// Returns `true` when both handles refer to the same shared value.
    pub fn same_as(&self, other: &SharedCounter) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for SharedCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCounter")
            .field("value", &self.get())
            .field("max", &self.max())
            .finish()
    }
}

/// Scoped, exclusive access to a [`SharedCounter`].
pub struct CounterGuard<'a> {
    cell: &'a CounterCell,
    value: u64,
    // Dropped after `Drop::drop` wrote the value back.
    lock: ProcessLockGuard<'a>,
}

impl Deref for CounterGuard<'_> {
    type Target = u64;

    fn deref(&self) -> &u64 {
        &self.value
    }
}

impl DerefMut for CounterGuard<'_> {
    fn deref_mut(&mut self) -> &mut u64 {
        &mut self.value
    }
}

impl Drop for CounterGuard<'_> {
    fn drop(&mut self) {
        if !self.lock.is_held() {
            warn!(value = self.value, "dropping counter write, lock was revoked");
            return;
        }
        self.cell.value.store(self.value, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::thread;

    #[test]
    fn basic_ops() {
        let c = SharedCounter::new(3).unwrap();
        assert_eq!(c.get(), 3);
        c.set(10);
        assert_eq!(c.inc(5), 15);
        assert_eq!(c.max(), None);

        let m = SharedCounter::with_max(0, 100).unwrap();
        assert_eq!(m.max(), Some(100));
        m.set_max(None);
        assert_eq!(m.max(), None);
    }

    #[test]
    fn clones_share_the_value() {
        let a = SharedCounter::new(0).unwrap();
        let b = a.clone();
        a.inc(1);
        assert_eq!(b.get(), 1);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&SharedCounter::new(0).unwrap()));
    }

    /// Concurrent read-modify-write through the guard must be lossless.
    #[test]
    fn concurrent_increments_are_lossless() {
        let c = SharedCounter::new(0).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = c.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let mut g = c.lock();
                        *g += 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(c.get(), 4000);
    }

    #[test]
    fn guard_releases_on_panic() {
        let c = SharedCounter::new(0).unwrap();
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut g = c.lock();
            *g = 41;
            panic!("inside critical section");
        }));
        assert!(res.is_err());
        // Lock is free again and the partial write is visible.
        assert_eq!(c.inc(1), 42);
    }

    #[test]
    fn revoked_guard_does_not_write_back() {
        let c = SharedCounter::new(7).unwrap();
        let mut g = c.lock();
        *g = 99;
        // Another process took the lock over from us.
        c.cell.lock.force_holder(1);
        drop(g);

        assert_eq!(c.cell.value.load(Ordering::Acquire), 7);
        c.cell.lock.force_holder(0);
        assert_eq!(c.get(), 7);
    }

    #[test]
    fn inc_saturates() {
        let c = SharedCounter::new(u64::MAX - 1).unwrap();
        assert_eq!(c.inc(5), u64::MAX);
    }
}
