//! # Revocable process-shared lock.
//!
//! A [`ProcessLock`] is a word in shared memory that stores the pid of its
//! holder (`0` = free). Waiters spin briefly, then back off with short sleeps.
//!
//! ## Revocation
//! A waiter takes the lock over only when its holder is gone:
//! - the holder process no longer exists (`kill(pid, 0)` → `ESRCH`), or
//! - the holder has exited but was not reaped yet (zombie in `/proc`).
//!
//! A live holder is never revoked, however long it keeps the lock.
//!
//! The protected value is left as the dead holder wrote it: well-defined but
//! possibly mid-update from the holder's point of view. A guard whose lock was
//! taken away anyway (see [`ProcessLockGuard::is_held`]) must not write back.

use std::fs;
use std::hint;
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::warn;

use crate::shared::segment::Zeroable;

/// Busy-wait iterations before a waiter starts sleeping.
const SPIN_LIMIT: u32 = 200;

/// Sleep between acquisition attempts once spinning gave up.
const BACKOFF: Duration = Duration::from_micros(50);

#[repr(C)]
pub(crate) struct ProcessLock {
    holder: AtomicI32,
}

// SAFETY: one atomic; all-zero means "free".
unsafe impl Zeroable for ProcessLock {}

impl ProcessLock {
    /// Acquires the lock, revoking it from a holder that has exited.
    pub(crate) fn lock(&self) -> ProcessLockGuard<'_> {
        let me = current_pid();
        let mut spins = 0u32;

        loop {
            if self
                .holder
                .compare_exchange_weak(0, me, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return ProcessLockGuard { lock: self, me };
            }

            if spins < SPIN_LIMIT {
                spins += 1;
                hint::spin_loop();
                continue;
            }
            thread::sleep(BACKOFF);

            let holder = self.holder.load(Ordering::Relaxed);
            if holder == 0 || holder == me || !holder_gone(holder) {
                continue;
            }
            if self
                .holder
                .compare_exchange(holder, me, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                warn!(holder, "revoked shared lock from exited process");
                return ProcessLockGuard { lock: self, me };
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn holder(&self) -> i32 {
        self.holder.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn force_holder(&self, pid: i32) {
        self.holder.store(pid, Ordering::Relaxed);
    }
}

/// Releases the lock on drop, including during unwinding.
pub(crate) struct ProcessLockGuard<'a> {
    lock: &'a ProcessLock,
    me: i32,
}

impl ProcessLockGuard<'_> {
    /// Returns `true` while the lock word still names this process.
    pub(crate) fn is_held(&self) -> bool {
        self.lock.holder.load(Ordering::Acquire) == self.me
    }
}

impl Drop for ProcessLockGuard<'_> {
    fn drop(&mut self) {
        if self
            .lock
            .holder
            .compare_exchange(self.me, 0, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            warn!(pid = self.me, "shared lock was revoked while held");
        }
    }
}

fn current_pid() -> i32 {
    // Not cached: forked children must see their own pid.
    std::process::id() as i32
}

/// Returns `true` when `pid` has exited, reaped or not.
fn holder_gone(pid: i32) -> bool {
    matches!(kill(Pid::from_raw(pid), None), Err(Errno::ESRCH)) || is_zombie(pid)
}

/// Reads the state field of `/proc/<pid>/stat`; `false` where `/proc` is absent.
fn is_zombie(pid: i32) -> bool {
    let Ok(stat) = fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // `comm` may contain spaces and parentheses; the state follows the last ')'.
    stat.rfind(')')
        .and_then(|at| stat[at + 1..].split_whitespace().next())
        .is_some_and(|state| state == "Z" || state == "X")
}
