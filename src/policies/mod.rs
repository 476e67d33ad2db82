//! Worker signal policies.
//!
//! This module groups the knobs that control **how** a worker reacts to
//! `SIGINT` and `SIGTERM`.
//!
//! ## Contents
//! - [`SignalPolicy`] stop / ignore / custom handler, configured per signal
//! - [`SignalHandler`] user callback deciding the reaction at delivery time
//! - [`SignalAction`] what a handler asks for (stop or keep running)
//! - [`ControlSignal`] the two configurable signals
//! - [`Reaction`] how a policy is installed in the worker
//!
//! ## Quick wiring
//! ```text
//! LoopConfig { sigint: SignalPolicy, sigterm: SignalPolicy }
//!      └─► worker installs one handler per signal at start:
//!           - Stop     → exit at the next safe point (or at once, mid-tick, if interruptible)
//!           - Ignore   → SIG_IGN
//!           - Handler  → flag the signal; run the callback between ticks
//! ```
//!
//! ## Defaults
//! - `SignalPolicy::Stop` for both signals.

mod signal;

pub use signal::{ControlSignal, Reaction, SignalAction, SignalHandler, SignalPolicy};
