//! # loopvisor
//!
//! **Loopvisor** runs a piece of work repeatedly in a separate worker process
//! and keeps the owner in control of it. On top of that it provides counters
//! and strings shared between processes, and live terminal progress bars that
//! render them from their own worker.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  owner process
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Loop<W: Work>                     ProgressBar                    │
//! │  - start / pause / resume / stop   - Loop<Renderer>               │
//! │  - waitpid, exit status mapping    - reset / set_prepend          │
//! └──────┬──────────────────────────────────────┬─────────────────────┘
//!        │ fork + SIGUSR1/SIGUSR2/SIGTERM       │ fork + signals
//!        ▼                                      ▼
//! ┌──────────────┐                       ┌──────────────┐
//! │ worker:      │ ──inc──►┌─────────┐◄──│ worker:      │──► terminal
//! │ W::tick()    │         │ Shared  │   │ Renderer     │
//! │ every        │         │ Counter │   │ ::tick()     │
//! │ interval     │         │ (mmap)  │   │              │
//! └──────────────┘         └─────────┘   └──────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Idle ──start()──► Running ◄──resume()── Paused
//!                     │  └────pause()───────►│
//!                     ▼                      ▼
//!                  Stopping (SIGTERM, waitpid up to grace)
//!                     │
//!                     ├─ exit 0 / killed by owner ─► Stopped
//!                     └─ exit != 0 / foreign signal ─► Failed (error returned once)
//!
//! Stopped / Failed ──start()──► Running (fresh worker process)
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                        |
//! |-------------------|-----------------------------------------------------------------|-------------------------------------------|
//! | **Supervision**   | Fork, pause, resume, stop and kill a recurring worker.          | [`Loop`], [`SupervisorState`]             |
//! | **Work**          | Define ticks as closures or types.                              | [`Work`], [`WorkFn`], [`Step`]            |
//! | **Policies**      | Decide how workers react to `SIGINT` / `SIGTERM`.               | [`SignalPolicy`], [`SignalHandler`]       |
//! | **Shared state**  | Values visible to every forked process.                         | [`SharedCounter`], [`SharedString`]       |
//! | **Progress**      | Live multi-line progress display with speed and time to go.     | [`ProgressBar`], [`SpeedEstimator`]       |
//! | **Errors**        | Typed errors for owners and ticks.                              | [`LoopError`], [`WorkError`]              |
//! | **Configuration** | Interval, grace period, kill escalation.                        | [`LoopConfig`]                            |
//!
//! ## Platform
//! Unix only: workers are `fork(2)`ed processes and shared values live in
//! `MAP_SHARED` memory. Forking copies the calling thread only, so start
//! workers before spawning threads that hold locks the work needs.
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use loopvisor::{Loop, LoopConfig, ProgressBar, SharedCounter};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let done = SharedCounter::with_max(0, 50)?;
//!
//!     // Producer: one unit of work per tick, stops itself at the end.
//!     let counter = done.clone();
//!     let mut producer = Loop::from_fn(
//!         move || counter.inc(1) >= 50,
//!         LoopConfig::every(Duration::from_millis(20)).with_name("producer"),
//!     );
//!
//!     let mut bar = ProgressBar::counter([done])?;
//!     bar.start()?;
//!     producer.start()?;
//!     while producer.is_alive() {
//!         std::thread::sleep(Duration::from_millis(50));
//!     }
//!     producer.stop()?;
//!     bar.stop()?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod policies;
mod progress;
mod shared;
mod tasks;

// ---- Public re-exports ----

pub use config::LoopConfig;
pub use crate::core::{Loop, SupervisorState};
pub use error::{LoopError, WorkError};
pub use policies::{ControlSignal, Reaction, SignalAction, SignalHandler, SignalPolicy};
pub use progress::{
    DEFAULT_SPEED_CALC_CYCLES, FileTerminal, PREPEND_CAPACITY, ProgressBar, ProgressBarBuilder,
    SpeedEstimator, StdoutTerminal, Style, Terminal, Width, humanize_speed, humanize_time,
};
pub use shared::{CounterGuard, SharedCounter, SharedString};
pub use tasks::{IntoStep, Step, Work, WorkFn};
