//! Work definitions.
//!
//! This module provides the [`Work`] trait (one synchronous tick of a
//! supervised worker) and [`WorkFn`], an adapter turning any closure into work.
//!
//! ## Quick wiring
//! ```text
//! WorkFn::new("name", || -> () | bool | Step | Result<_, E>)
//!      └─► Loop::new(work, LoopConfig)
//!           └─► worker process: tick() every interval until Step::Stop
//! ```

mod work;
mod work_fn;

pub use work::{IntoStep, Step, Work};
pub use work_fn::WorkFn;
