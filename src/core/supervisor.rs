//! # Loop: owner side of a supervised worker process.
//!
//! A [`Loop`] owns one worker process that calls [`Work::tick`] at a fixed
//! interval. The owner controls it with POSIX signals and observes it with
//! `waitpid`; it never reads or writes the worker's memory.
//!
//! ## Architecture
//! ```text
//! owner process                               worker process (fork)
//! ─────────────                               ─────────────────────
//! start() ──fork──────────────────────────►   install signal policy
//!    └─ wait for ready (≤ 2s) ◄── ready ───   loop { tick(); sleep }
//! pause()  ──SIGUSR1─────────────────────►    suspend after current tick
//! resume() ──SIGUSR2─────────────────────►    tick again
//! stop()   ──SIGTERM─────────────────────►    per sigterm policy
//!    └─ waitpid every 5ms up to grace
//!         ├─ exited        → Stopped / Failed
//!         └─ still alive   → SIGKILL (auto_kill) or StopTimeout
//! kill()   ──SIGKILL─────────────────────►    gone
//! ```
//!
//! ## Rules
//! - `start()` on a live worker returns the existing pid
//! - `stop()` on a stopped worker is a no-op
//! - A worker failure is stored when the worker is reaped and returned
//!   exactly once by the next `stop()`, `terminate()`, `kill()` or scope exit
//! - Dropping a `Loop` terminates its worker
//! - While `stop()` waits out the grace period, other threads sharing the
//!   `Loop` can still query `state()` and `is_alive()`
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use loopvisor::{Loop, LoopConfig, SharedCounter};
//!
//! let ticks = SharedCounter::new(0)?;
//! let seen = ticks.clone();
//!
//! let worker = Loop::from_fn(move || { seen.inc(1); }, LoopConfig::every(Duration::from_millis(50)));
//! worker.scope(|w| {
//!     w.start()?;
//!     std::thread::sleep(Duration::from_millis(300));
//!     Ok::<_, loopvisor::LoopError>(())
//! })??;
//!
//! assert!(ticks.get() >= 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork, getpid};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::LoopConfig;
use crate::core::signals;
use crate::core::state::SupervisorState;
use crate::core::worker::{self, Control};
use crate::error::LoopError;
use crate::shared::segment::Shared;
use crate::tasks::{IntoStep, Work, WorkFn};

/// Longest time `start()` waits for a new worker to install its signal policy.
const READY_TIMEOUT: Duration = Duration::from_secs(2);

/// Interval between liveness polls while waiting for a worker to exit.
const POLL: Duration = Duration::from_millis(5);

struct Inner {
    pid: Option<Pid>,
    state: SupervisorState,
    pending: Option<LoopError>,
}

/// Supervisor of one worker process repeating a [`Work`].
pub struct Loop<W: Work> {
    work: W,
    config: LoopConfig,
    inner: Mutex<Inner>,
}

impl<W: Work> Loop<W> {
    /// Creates an idle supervisor. Nothing runs until [`start`](Self::start).
    pub fn new(work: W, config: LoopConfig) -> Self {
        Self {
            work,
            config,
            inner: Mutex::new(Inner {
                pid: None,
                state: SupervisorState::Idle,
                pending: None,
            }),
        }
    }

    /// Returns the work as held by the owner.
    ///
    /// A running worker has its own copy, taken at fork time.
    pub fn work(&self) -> &W {
        &self.work
    }

    /// Forks the worker process and returns its pid.
    ///
    /// Returns the existing pid if a worker is already alive. Blocks until the
    /// worker has installed its signal policy (at most 2s); a worker that dies
    /// before that has its failure returned here.
    pub fn start(&mut self) -> Result<i32, LoopError> {
        let name = self.config.name.as_str();
        let mut inner = self.inner.lock();
        refresh(&mut inner, name);
        if let (true, Some(pid)) = (inner.state.is_alive(), inner.pid) {
            debug!(pid = pid.as_raw(), name, "worker already running");
            return Ok(pid.as_raw());
        }

        let control = Shared::<Control>::new().map_err(|source| LoopError::Spawn { source })?;
        let owner = getpid();

        // SAFETY: the child only runs the worker body and leaves through `_exit`.
        match unsafe { fork() } {
            Err(errno) => Err(LoopError::Spawn {
                source: errno.into(),
            }),
            Ok(ForkResult::Child) => worker::enter(&mut self.work, &self.config, &control, owner),
            Ok(ForkResult::Parent { child }) => {
                inner.pid = Some(child);
                inner.state = SupervisorState::Running;
                info!(pid = child.as_raw(), name, "worker started");
                await_ready(&mut inner, &control, child, name)?;
                Ok(child.as_raw())
            }
        }
    }

    /// Suspends ticking. The current tick, if any, completes first.
    ///
    /// No-op unless the worker is running.
    pub fn pause(&self) -> Result<(), LoopError> {
        self.transition(
            SupervisorState::Running,
            SupervisorState::Paused,
            signals::PAUSE,
        )
    }

    /// Resumes a paused worker. No-op unless the worker is paused.
    pub fn resume(&self) -> Result<(), LoopError> {
        self.transition(
            SupervisorState::Paused,
            SupervisorState::Running,
            signals::RESUME,
        )
    }

    /// Requests a graceful stop and waits up to `grace` for the worker to exit.
    ///
    /// With `auto_kill_on_last_resort` a worker outliving the grace period is
    /// killed; otherwise [`LoopError::StopTimeout`] is returned and the worker
    /// keeps running in its previous state. Returns a stored worker failure, if any.
    pub fn stop(&self) -> Result<(), LoopError> {
        self.shutdown(self.config.auto_kill_on_last_resort)
    }

    /// Like [`stop`](Self::stop), but always kills a worker outliving the grace period.
    pub fn terminate(&self) -> Result<(), LoopError> {
        self.shutdown(true)
    }

    /// Kills the worker without grace period and reaps it.
    pub fn kill(&self) -> Result<(), LoopError> {
        let name = self.config.name.as_str();
        let mut inner = self.inner.lock();
        refresh(&mut inner, name);
        match inner.pid {
            Some(pid) if inner.state.is_alive() => kill_and_reap(&mut inner, pid, name),
            _ => take_pending(&mut inner),
        }
    }

    /// Returns the pid of the current or last worker, `None` if never started.
    pub fn getpid(&self) -> Option<i32> {
        self.inner.lock().pid.map(Pid::as_raw)
    }

    /// Non-blocking liveness check. A paused worker is alive.
    pub fn is_alive(&self) -> bool {
        self.state().is_alive()
    }

    /// Returns the lifecycle state, reaping the worker if it has exited.
    pub fn state(&self) -> SupervisorState {
        let mut inner = self.inner.lock();
        refresh(&mut inner, &self.config.name);
        inner.state
    }

    /// Runs `body`, then terminates the worker.
    ///
    /// Returns the worker's failure instead of `body`'s value if it failed.
    /// If `body` panics the worker is terminated while unwinding.
    pub fn scope<T>(mut self, body: impl FnOnce(&mut Self) -> T) -> Result<T, LoopError> {
        let value = body(&mut self);
        self.terminate()?;
        Ok(value)
    }

    fn transition(
        &self,
        from: SupervisorState,
        to: SupervisorState,
        signal: Signal,
    ) -> Result<(), LoopError> {
        let name = self.config.name.as_str();
        let mut inner = self.inner.lock();
        refresh(&mut inner, name);
        let Some(pid) = inner.pid.filter(|_| inner.state == from) else {
            return Ok(());
        };
        if send(pid, signal)? {
            inner.state = to;
            debug!(pid = pid.as_raw(), name, state = %to, "worker {}", to);
        } else {
            poll(&mut inner, pid, name);
        }
        Ok(())
    }

    fn shutdown(&self, force: bool) -> Result<(), LoopError> {
        let name = self.config.name.as_str();
        let grace = self.config.grace;
        let (pid, previous) = {
            let mut inner = self.inner.lock();
            refresh(&mut inner, name);
            let pid = match inner.pid {
                Some(pid) if inner.state.is_alive() => pid,
                _ => return take_pending(&mut inner),
            };
            let previous = inner.state;
            inner.state = SupervisorState::Stopping;
            debug!(pid = pid.as_raw(), name, ?grace, "stopping worker");
            if let Err(e) = send(pid, signals::STOP) {
                inner.state = previous;
                return Err(e);
            }
            (pid, previous)
        };

        // The lock is released between polls so other threads can query state.
        let deadline = Instant::now() + grace;
        loop {
            {
                let mut inner = self.inner.lock();
                if !inner.state.is_alive() || poll(&mut inner, pid, name) {
                    return take_pending(&mut inner);
                }
            }
            if Instant::now() >= deadline {
                break;
            }
            thread::sleep(POLL);
        }

        let mut inner = self.inner.lock();
        if !inner.state.is_alive() || poll(&mut inner, pid, name) {
            return take_pending(&mut inner);
        }
        if force {
            warn!(pid = pid.as_raw(), name, ?grace, "worker outlived grace period, killing");
            return kill_and_reap(&mut inner, pid, name);
        }
        warn!(pid = pid.as_raw(), name, ?grace, "worker still alive after grace period");
        if inner.state == SupervisorState::Stopping {
            inner.state = previous;
        }
        Err(LoopError::StopTimeout {
            pid: pid.as_raw(),
            grace,
        })
    }
}

impl<F, R> Loop<WorkFn<F>>
where
    F: FnMut() -> R,
    R: IntoStep,
{
    /// Supervises a closure; the log name is taken from `config.name`.
    pub fn from_fn(f: F, config: LoopConfig) -> Self {
        let work = WorkFn::new(config.name.clone(), f);
        Self::new(work, config)
    }
}

impl<W: Work> fmt::Debug for Loop<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Loop")
            .field("name", &self.config.name)
            .field("pid", &inner.pid.map(Pid::as_raw))
            .field("state", &inner.state)
            .finish()
    }
}

impl<W: Work> Drop for Loop<W> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if !inner.state.is_alive() && inner.pending.is_none() {
            return;
        }
        if let Err(e) = self.terminate() {
            error!(name = %self.config.name, label = e.as_label(), "{}", e.as_message());
        }
    }
}

fn await_ready(
    inner: &mut Inner,
    control: &Control,
    pid: Pid,
    name: &str,
) -> Result<(), LoopError> {
    let deadline = Instant::now() + READY_TIMEOUT;
    while !control.ready.load(Ordering::Acquire) {
        if poll(inner, pid, name) {
            return take_pending(inner);
        }
        if Instant::now() >= deadline {
            warn!(pid = pid.as_raw(), name, "worker did not report ready in time");
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

/// Delivers `signal`; `Ok(false)` if the process no longer exists.
fn send(pid: Pid, signal: Signal) -> Result<bool, LoopError> {
    match kill(pid, signal) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => Err(LoopError::Signal { source }),
    }
}

fn refresh(inner: &mut Inner, name: &str) {
    if let (true, Some(pid)) = (inner.state.is_alive(), inner.pid) {
        poll(inner, pid, name);
    }
}

/// Reaps the worker if it has exited. Returns `true` once it is gone.
fn poll(inner: &mut Inner, pid: Pid, name: &str) -> bool {
    match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
        Ok(status) => settle(inner, status, name),
        Err(Errno::ECHILD) => {
            inner.state = SupervisorState::Stopped;
            true
        }
        Err(e) => {
            debug!(pid = pid.as_raw(), name, error = %e, "waitpid failed");
            false
        }
    }
}

fn kill_and_reap(inner: &mut Inner, pid: Pid, name: &str) -> Result<(), LoopError> {
    send(pid, Signal::SIGKILL)?;
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if settle(inner, status, name) {
                    break;
                }
            }
            Err(Errno::EINTR) => continue,
            Err(_) => {
                inner.state = SupervisorState::Stopped;
                break;
            }
        }
    }
    take_pending(inner)
}

/// Records the final state of an exited worker.
fn settle(inner: &mut Inner, status: WaitStatus, name: &str) -> bool {
    let (state, failure) = match status {
        WaitStatus::Exited(_, 0) | WaitStatus::Signaled(_, Signal::SIGKILL, _) => {
            (SupervisorState::Stopped, None)
        }
        WaitStatus::Exited(pid, code) => (
            SupervisorState::Failed,
            Some(LoopError::WorkerFailed {
                pid: pid.as_raw(),
                code,
            }),
        ),
        WaitStatus::Signaled(pid, signal, _) => (
            SupervisorState::Failed,
            Some(LoopError::WorkerCrashed {
                pid: pid.as_raw(),
                signal: signal.as_str().to_string(),
            }),
        ),
        _ => return false,
    };

    match &failure {
        None => info!(pid = ?inner.pid.map(Pid::as_raw), name, ?status, "worker exited"),
        Some(e) => warn!(name, label = e.as_label(), "{}", e.as_message()),
    }
    inner.state = state;
    if failure.is_some() {
        inner.pending = failure;
    }
    true
}

fn take_pending(inner: &mut Inner) -> Result<(), LoopError> {
    match inner.pending.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
