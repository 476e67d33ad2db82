//! # Function-backed work (`WorkFn`)
//!
//! [`WorkFn`] wraps a closure `F: FnMut() -> R` where `R: IntoStep`. The
//! closure is copied into the worker process at fork time, so state it
//! mutates stays in the worker; share results through
//! [`SharedCounter`](crate::SharedCounter) or [`SharedString`](crate::SharedString).
//!
//! ## Example
//! ```rust
//! use loopvisor::{Work, WorkFn};
//!
//! let mut n = 0;
//! let w = WorkFn::new("count-to-3", move || {
//!     n += 1;
//!     n == 3
//! });
//! assert_eq!(w.name(), "count-to-3");
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::error::WorkError;
use crate::tasks::work::{IntoStep, Step, Work};

/// Function-backed work implementation.
pub struct WorkFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkFn<F> {
    /// Creates a new function-backed work unit.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for WorkFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkFn").field("name", &self.name).finish()
    }
}

impl<F, R> Work for WorkFn<F>
where
    F: FnMut() -> R,
    R: IntoStep,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self) -> Result<Step, WorkError> {
        (self.f)().into_step()
    }
}
