//! Runtime core: process supervision.
//!
//! The only public API from this module is [`Loop`] and its [`SupervisorState`].
//!
//! Internal modules:
//! - [`supervisor`]: owner side; fork, control signals, reaping, grace period;
//! - [`worker`]: body of the forked child; tick loop and exit status;
//! - [`signals`]: async-signal-safe handlers installed in the worker;
//! - [`state`]: owner-side lifecycle state.

mod signals;
mod state;
mod supervisor;
mod worker;

pub use state::SupervisorState;
pub use supervisor::Loop;
