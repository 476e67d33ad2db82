//! # Signal policies for worker processes.
//!
//! [`SignalPolicy`] decides how a worker reacts to an externally delivered
//! interrupt (`SIGINT`) or terminate (`SIGTERM`) signal.
//!
//! - [`SignalPolicy::Stop`] the worker stops gracefully, as if it had asked to stop itself (default).
//! - [`SignalPolicy::Ignore`] the signal has no effect; only `SIGKILL` ends the worker.
//! - [`SignalPolicy::Handler`] a caller-supplied [`SignalHandler`] decides.
//!
//! The policy is installed in the **worker** only; the owner process keeps
//! whatever disposition it had.
//!
//! ## Choosing the right policy
//! ```text
//! SignalPolicy::Stop     → Ctrl-C / kill end the worker (owner stop() works)
//! SignalPolicy::Ignore   → "stubborn" worker: survives SIGINT/SIGTERM,
//!                          owner stop() only succeeds through kill escalation
//! SignalPolicy::Handler  → handler runs at the next safe point of the worker
//!                          (between ticks) and returns Stop or Continue
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::LoopError;

/// Signals covered by a [`SignalPolicy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlSignal {
    /// `SIGINT`
    Interrupt,
    /// `SIGTERM`
    Terminate,
}

impl ControlSignal {
    /// Returns the conventional signal name.
    pub fn as_str(self) -> &'static str {
        match self {
            ControlSignal::Interrupt => "SIGINT",
            ControlSignal::Terminate => "SIGTERM",
        }
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision returned by a [`SignalHandler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalAction {
    /// Stop the worker gracefully after the current tick.
    Stop,
    /// Keep running.
    Continue,
}

/// Caller-supplied reaction to an interrupt or terminate signal.
///
/// The handler never runs in signal context: the worker records the signal and
/// invokes the handler at its next safe point (before the next tick or while
/// sleeping). Closures `Fn(ControlSignal) -> SignalAction` implement it.
pub trait SignalHandler: Send + Sync + 'static {
    /// Decides whether the worker should stop.
    fn on_signal(&self, signal: ControlSignal) -> SignalAction;
}

impl<F> SignalHandler for F
where
    F: Fn(ControlSignal) -> SignalAction + Send + Sync + 'static,
{
    fn on_signal(&self, signal: ControlSignal) -> SignalAction {
        self(signal)
    }
}

/// Reaction class of a policy, as seen from the signal handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reaction {
    /// Stop the worker.
    StopSelf,
    /// Do nothing.
    Ignore,
    /// Defer to the caller's handler.
    Delegate,
}

/// Policy controlling how a worker reacts to `SIGINT` / `SIGTERM`.
#[derive(Clone, Default)]
pub enum SignalPolicy {
    /// Gracefully stop the worker (default).
    #[default]
    Stop,
    /// Ignore the signal.
    Ignore,
    /// Delegate the decision to a handler.
    Handler(Arc<dyn SignalHandler>),
}

impl SignalPolicy {
    /// Wraps a handler into a [`SignalPolicy::Handler`].
    pub fn handler(handler: impl SignalHandler) -> Self {
        SignalPolicy::Handler(Arc::new(handler))
    }

    /// Returns the reaction class of this policy.
    pub fn reaction(&self) -> Reaction {
        match self {
            SignalPolicy::Stop => Reaction::StopSelf,
            SignalPolicy::Ignore => Reaction::Ignore,
            SignalPolicy::Handler(_) => Reaction::Delegate,
        }
    }

    /// Resolves what the worker should do about a received `signal`.
    ///
    /// Calls the handler for [`SignalPolicy::Handler`].
    pub fn resolve(&self, signal: ControlSignal) -> SignalAction {
        match self {
            SignalPolicy::Stop => SignalAction::Stop,
            SignalPolicy::Ignore => SignalAction::Continue,
            SignalPolicy::Handler(h) => h.on_signal(signal),
        }
    }
}

impl fmt::Debug for SignalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalPolicy::Stop => f.write_str("Stop"),
            SignalPolicy::Ignore => f.write_str("Ignore"),
            SignalPolicy::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl FromStr for SignalPolicy {
    type Err = LoopError;

    /// Parses `"stop"`, `"ign"` or `"ignore"` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" => Ok(SignalPolicy::Stop),
            "ign" | "ignore" => Ok(SignalPolicy::Ignore),
            other => Err(LoopError::invalid(format!(
                "unknown signal policy {other:?} (expected \"stop\" or \"ign\")"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn default_is_stop() {
        let p = SignalPolicy::default();
        assert_eq!(p.reaction(), Reaction::StopSelf);
        assert_eq!(p.resolve(ControlSignal::Interrupt), SignalAction::Stop);
        assert_eq!(p.resolve(ControlSignal::Terminate), SignalAction::Stop);
    }

    #[test]
    fn ignore_never_stops() {
        let p = SignalPolicy::Ignore;
        assert_eq!(p.reaction(), Reaction::Ignore);
        assert_eq!(p.resolve(ControlSignal::Interrupt), SignalAction::Continue);
        assert_eq!(p.resolve(ControlSignal::Terminate), SignalAction::Continue);
    }

    #[test]
    fn handler_decides_per_signal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let p = SignalPolicy::handler(move |sig: ControlSignal| {
            seen.fetch_add(1, Ordering::SeqCst);
            match sig {
                ControlSignal::Interrupt => SignalAction::Continue,
                ControlSignal::Terminate => SignalAction::Stop,
            }
        });

        assert_eq!(p.reaction(), Reaction::Delegate);
        assert_eq!(p.resolve(ControlSignal::Interrupt), SignalAction::Continue);
        assert_eq!(p.resolve(ControlSignal::Terminate), SignalAction::Stop);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn parses_legacy_names() {
        assert_eq!("stop".parse::<SignalPolicy>().unwrap().reaction(), Reaction::StopSelf);
        assert_eq!("ign".parse::<SignalPolicy>().unwrap().reaction(), Reaction::Ignore);
        assert_eq!(" Ignore ".parse::<SignalPolicy>().unwrap().reaction(), Reaction::Ignore);

        let err = "halt".parse::<SignalPolicy>().unwrap_err();
        assert_eq!(err.as_label(), "loop_invalid_configuration");
    }
}
