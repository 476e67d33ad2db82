//! # Work abstraction.
//!
//! A [`Work`] is the unit a worker process repeats: one call to
//! [`tick`](Work::tick) per interval, strictly sequential, until it returns
//! [`Step::Stop`], fails, or the worker is stopped from outside.

use std::fmt::Display;

use crate::error::WorkError;

/// Outcome of one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Step {
    /// Keep ticking.
    #[default]
    Continue,
    /// Stop the worker gracefully before the next tick.
    Stop,
}

/// # Repeating unit of work executed inside a worker process.
///
/// # Example
/// ```
/// use loopvisor::{Step, Work, WorkError};
///
/// struct Countdown(u32);
///
/// impl Work for Countdown {
///     fn name(&self) -> &str { "countdown" }
///
///     fn tick(&mut self) -> Result<Step, WorkError> {
///         self.0 = self.0.saturating_sub(1);
///         Ok(if self.0 == 0 { Step::Stop } else { Step::Continue })
///     }
/// }
/// ```
pub trait Work {
    /// Returns a stable, human-readable name used in logs.
    fn name(&self) -> &str {
        "work"
    }

    /// Executes one tick.
    ///
    /// An error (or a panic) ends the worker with a failure status.
    fn tick(&mut self) -> Result<Step, WorkError>;

    /// Called once in the worker after the last tick of a graceful stop.
    fn on_stop(&mut self) {}

    /// Whether a stop signal may end the worker in the middle of a tick.
    ///
    /// When `false`, a stop request received during a tick is honored after
    /// the tick returns.
    fn interruptible(&self) -> bool {
        true
    }
}

/// Conversion of a closure's return value into a tick outcome.
///
/// - `()` → [`Step::Continue`]
/// - `bool` → `true` is the stop sentinel
/// - [`Step`] as is
/// - `Result<T, E>` → `Ok` converts `T`, `Err` becomes [`WorkError::Fail`]
pub trait IntoStep {
    /// Performs the conversion.
    fn into_step(self) -> Result<Step, WorkError>;
}

impl IntoStep for () {
    fn into_step(self) -> Result<Step, WorkError> {
        Ok(Step::Continue)
    }
}

impl IntoStep for bool {
    fn into_step(self) -> Result<Step, WorkError> {
        Ok(if self { Step::Stop } else { Step::Continue })
    }
}

impl IntoStep for Step {
    fn into_step(self) -> Result<Step, WorkError> {
        Ok(self)
    }
}

impl<T: IntoStep, E: Display> IntoStep for Result<T, E> {
    fn into_step(self) -> Result<Step, WorkError> {
        match self {
            Ok(t) => t.into_step(),
            Err(e) => Err(WorkError::fail(e)),
        }
    }
}
