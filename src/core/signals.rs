//! # Worker-side signal handling.
//!
//! Installed in the worker process right after fork, never in the owner.
//!
//! ## Signals
//! - `SIGINT` / `SIGTERM`: per [`SignalPolicy`]
//!   - `Stop`: request a graceful stop; during an interruptible tick the
//!     worker exits at once with status 0
//!   - `Ignore`: disposition set to `SIG_IGN`
//!   - `Handler`: recorded, the handler runs at the next safe point
//! - `SIGUSR1`: pause
//! - `SIGUSR2`: resume
//!
//! The handler only touches atomics and may call `_exit`, both
//! async-signal-safe.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use tracing::debug;

use crate::policies::{ControlSignal, Reaction, SignalPolicy};

/// Signal the owner sends to pause a worker.
pub(crate) const PAUSE: Signal = Signal::SIGUSR1;
/// Signal the owner sends to resume a worker.
pub(crate) const RESUME: Signal = Signal::SIGUSR2;
/// Signal the owner sends for a graceful stop.
pub(crate) const STOP: Signal = Signal::SIGTERM;

const REACT_STOP: u8 = 0;
const REACT_DELEGATE: u8 = 1;

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);
static PAUSED: AtomicBool = AtomicBool::new(false);
static RESUMED: AtomicBool = AtomicBool::new(false);
static IN_INTERRUPTIBLE_TICK: AtomicBool = AtomicBool::new(false);
static PENDING_INT: AtomicBool = AtomicBool::new(false);
static PENDING_TERM: AtomicBool = AtomicBool::new(false);
static INT_REACTION: AtomicU8 = AtomicU8::new(REACT_STOP);
static TERM_REACTION: AtomicU8 = AtomicU8::new(REACT_STOP);

extern "C" fn on_signal(raw: libc::c_int) {
    match raw {
        libc::SIGUSR1 => PAUSED.store(true, Ordering::SeqCst),
        libc::SIGUSR2 => {
            PAUSED.store(false, Ordering::SeqCst);
            RESUMED.store(true, Ordering::SeqCst);
        }
        libc::SIGINT => react(&INT_REACTION, &PENDING_INT),
        libc::SIGTERM => react(&TERM_REACTION, &PENDING_TERM),
        _ => {}
    }
}

fn react(reaction: &AtomicU8, pending: &AtomicBool) {
    if reaction.load(Ordering::SeqCst) == REACT_DELEGATE {
        pending.store(true, Ordering::SeqCst);
        return;
    }
    if IN_INTERRUPTIBLE_TICK.load(Ordering::SeqCst) {
        // SAFETY: `_exit` is async-signal-safe and skips all user-space cleanup.
        unsafe { libc::_exit(0) };
    }
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

/// Resets the flags and installs the handlers for this worker.
pub(crate) fn install(sigint: &SignalPolicy, sigterm: &SignalPolicy) -> nix::Result<()> {
    for flag in [
        &STOP_REQUESTED,
        &PAUSED,
        &RESUMED,
        &IN_INTERRUPTIBLE_TICK,
        &PENDING_INT,
        &PENDING_TERM,
    ] {
        flag.store(false, Ordering::SeqCst);
    }

    let handled = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    let ignored = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());

    for (signal, policy, reaction) in [
        (Signal::SIGINT, sigint, &INT_REACTION),
        (Signal::SIGTERM, sigterm, &TERM_REACTION),
    ] {
        let action = match policy.reaction() {
            Reaction::StopSelf => {
                reaction.store(REACT_STOP, Ordering::SeqCst);
                &handled
            }
            Reaction::Delegate => {
                reaction.store(REACT_DELEGATE, Ordering::SeqCst);
                &handled
            }
            Reaction::Ignore => &ignored,
        };
        // SAFETY: the handler only uses atomics and `_exit`.
        unsafe { sigaction(signal, action)? };
        debug!(signal = signal.as_str(), policy = ?policy, "installed signal policy");
    }

    for signal in [PAUSE, RESUME] {
        // SAFETY: see above.
        unsafe { sigaction(signal, &handled)? };
    }

    let mut unblock = SigSet::empty();
    for signal in [Signal::SIGINT, Signal::SIGTERM, PAUSE, RESUME] {
        unblock.add(signal);
    }
    unblock.thread_unblock()
}

/// Returns `true` once a graceful stop was requested.
pub(crate) fn stop_requested() -> bool {
    STOP_REQUESTED.load(Ordering::SeqCst)
}

/// Requests a graceful stop from inside the worker.
pub(crate) fn request_stop() {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

/// Returns `true` while the worker is paused.
pub(crate) fn paused() -> bool {
    PAUSED.load(Ordering::SeqCst)
}

/// Returns `true` once per resume.
pub(crate) fn take_resumed() -> bool {
    RESUMED.swap(false, Ordering::SeqCst)
}

/// Returns one delegated signal that is waiting for its handler, if any.
pub(crate) fn take_pending() -> Option<ControlSignal> {
    if PENDING_INT.swap(false, Ordering::SeqCst) {
        Some(ControlSignal::Interrupt)
    } else if PENDING_TERM.swap(false, Ordering::SeqCst) {
        Some(ControlSignal::Terminate)
    } else {
        None
    }
}

/// Marks the start of a tick. Returns `false` if a stop is already pending.
///
/// While an interruptible tick runs, a `Stop` signal ends the process at once.
pub(crate) fn enter_tick(interruptible: bool) -> bool {
    IN_INTERRUPTIBLE_TICK.store(interruptible, Ordering::SeqCst);
    if stop_requested() {
        IN_INTERRUPTIBLE_TICK.store(false, Ordering::SeqCst);
        return false;
    }
    true
}

/// Marks the end of a tick.
pub(crate) fn leave_tick() {
    IN_INTERRUPTIBLE_TICK.store(false, Ordering::SeqCst);
}
