//! Cross-process shared primitives.
//!
//! Values in this module live in anonymous `MAP_SHARED` memory. Every process
//! forked after a value was created sees the same bytes, so a counter created
//! by the owner can be incremented by producer workers and read by a progress
//! renderer at the same time.
//!
//! - [`SharedCounter`]: lock-guarded `u64` with an optional maximum hint;
//! - [`SharedString`]: lock-guarded fixed-capacity UTF-8 buffer.
//!
//! Each value has its own [`lock`](lock::ProcessLock); no code path holds two
//! of them at once.

mod counter;
mod lock;
pub(crate) mod segment;
mod string;

pub use counter::{CounterGuard, SharedCounter};
pub use string::SharedString;
