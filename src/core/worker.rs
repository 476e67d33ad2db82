//! # Worker process body.
//!
//! Runs in the forked child and never returns: the process ends with
//! `_exit`, so nothing copied from the owner (open handles, other loops,
//! shared mappings) is dropped or flushed twice.
//!
//! ## Tick loop
//! ```text
//! install signals ─► ready ─► loop {
//!   ├─► delegated signal pending?  → handler decides Stop / Continue
//!   ├─► stop requested / orphaned? → break
//!   ├─► paused?                    → sleep slice, continue
//!   ├─► before deadline?           → sleep slice, continue
//!   └─► tick()
//!         ├─► Continue → deadline = tick start + interval
//!         ├─► Stop     → break
//!         └─► Err/panic → log, exit 1
//! }
//! on_stop() ─► exit 0
//! ```
//!
//! ## Rules
//! - The first tick runs immediately
//! - Ticks never overlap; a slow tick delays the next one
//! - Between ticks, flags are polled at least every [`SLICE`]

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use nix::unistd::{Pid, getppid};
use tracing::{debug, error, warn};

use crate::config::LoopConfig;
use crate::core::signals;
use crate::error::WorkError;
use crate::policies::SignalAction;
use crate::shared::segment::Zeroable;
use crate::tasks::{Step, Work};

/// Longest uninterrupted sleep of a worker.
pub(crate) const SLICE: Duration = Duration::from_millis(10);

/// Exit status of a worker whose work failed.
pub(crate) const EXIT_FAILURE: i32 = 1;

/// Handshake between the owner and a freshly forked worker.
#[repr(C)]
pub(crate) struct Control {
    pub(crate) ready: AtomicBool,
}

// SAFETY: one atomic flag; zero means "not ready".
unsafe impl Zeroable for Control {}

/// Entry point of the forked child.
pub(crate) fn enter<W: Work>(work: &mut W, cfg: &LoopConfig, control: &Control, owner: Pid) -> ! {
    let code = match panic::catch_unwind(AssertUnwindSafe(|| run(work, cfg, control, owner))) {
        Ok(code) => code,
        Err(payload) => {
            let err = WorkError::from_panic(payload.as_ref());
            error!(name = %cfg.name, label = err.as_label(), "{}", err.as_message());
            EXIT_FAILURE
        }
    };
    let _ = io::stdout().flush();
    // SAFETY: terminates this process only; no destructors run.
    unsafe { libc::_exit(code) }
}

fn run<W: Work>(work: &mut W, cfg: &LoopConfig, control: &Control, owner: Pid) -> i32 {
    if let Err(e) = signals::install(&cfg.sigint, &cfg.sigterm) {
        error!(name = %cfg.name, error = %e, "failed to install signal handlers");
        return EXIT_FAILURE;
    }
    control.ready.store(true, Ordering::Release);
    debug!(name = %cfg.name, "worker ready");

    let interval = cfg.sleep_interval();
    let mut deadline = Instant::now();

    loop {
        while let Some(signal) = signals::take_pending() {
            let action = cfg.policy(signal).resolve(signal);
            debug!(name = %cfg.name, %signal, ?action, "delegated signal handled");
            if action == SignalAction::Stop {
                signals::request_stop();
            }
        }
        if signals::stop_requested() {
            break;
        }
        if getppid() != owner {
            warn!(name = %cfg.name, "owner process is gone, stopping orphaned worker");
            break;
        }
        if signals::take_resumed() {
            deadline = match interval {
                Some(d) if !cfg.run_on_resume => Instant::now() + d,
                _ => Instant::now(),
            };
        }
        if signals::paused() {
            thread::sleep(SLICE);
            continue;
        }

        let now = Instant::now();
        if now < deadline {
            thread::sleep((deadline - now).min(SLICE));
            continue;
        }

        if !signals::enter_tick(work.interruptible()) {
            break;
        }
        let result = work.tick();
        signals::leave_tick();

        match result {
            Ok(Step::Continue) => {}
            Ok(Step::Stop) => {
                debug!(name = %cfg.name, "work requested stop");
                break;
            }
            Err(err) => {
                error!(name = %cfg.name, label = err.as_label(), "{}", err.as_message());
                return EXIT_FAILURE;
            }
        }

        deadline = match interval {
            Some(d) => next_deadline(now, d),
            None => Instant::now(),
        };
    }

    work.on_stop();
    debug!(name = %cfg.name, "worker stopped");
    0
}

/// Next tick start for a tick that started at `started`.
///
/// Keeps a fixed cadence; if the tick overran by more than one interval the
/// next tick runs right away instead of catching up.
fn next_deadline(started: Instant, interval: Duration) -> Instant {
    let next = started + interval;
    let now = Instant::now();
    if next + interval < now { now } else { next }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_is_anchored_at_tick_start() {
        let started = Instant::now();
        let next = next_deadline(started, Duration::from_secs(60));
        assert_eq!(next, started + Duration::from_secs(60));
    }

    #[test]
    fn overrun_does_not_catch_up() {
        let started = Instant::now() - Duration::from_secs(10);
        let next = next_deadline(started, Duration::from_millis(100));
        assert!(next > started + Duration::from_secs(9));
    }
}
