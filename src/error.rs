//! Error types used by the loop supervisor, its workers and the progress bars.
//!
//! This module defines two main error enums:
//!
//! - [`LoopError`] errors surfaced to the owner of a [`Loop`](crate::Loop).
//! - [`WorkError`] errors raised by one tick of the work callable, inside the worker.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logs.

use std::time::Duration;

use thiserror::Error;

/// # Errors surfaced to the owner of a supervised worker.
///
/// Worker failures are never raised asynchronously; they are recorded when the
/// worker exits and returned by the next lifecycle call (`stop`, `terminate`,
/// `kill` or the end of [`Loop::scope`](crate::Loop::scope)).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LoopError {
    /// The work callable failed inside the worker, which exited with a failure status.
    #[error("worker {pid} failed (exit status {code})")]
    WorkerFailed {
        /// Process id of the failed worker.
        pid: i32,
        /// Exit status reported by the worker.
        code: i32,
    },

    /// The worker was ended by a fatal signal the owner did not send.
    #[error("worker {pid} crashed on signal {signal}")]
    WorkerCrashed {
        /// Process id of the crashed worker.
        pid: i32,
        /// Name of the terminating signal.
        signal: String,
    },

    /// Graceful stop was requested but the worker did not exit within the grace period
    /// and `auto_kill_on_last_resort` is off. The worker is still alive.
    #[error("worker {pid} still alive after {grace:?} grace period")]
    StopTimeout {
        /// Process id of the worker that is still running.
        pid: i32,
        /// The configured grace duration.
        grace: Duration,
    },

    /// Construction-time configuration error (mismatched list lengths, invalid interval, ...).
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A counter slot index outside the tracked range.
    #[error("slot {index} out of range (tracking {len} counters)")]
    SlotOutOfRange {
        /// Requested slot.
        index: usize,
        /// Number of tracked slots.
        len: usize,
    },

    /// Forking the worker or mapping shared memory failed.
    #[error("failed to spawn worker: {source}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Delivering a control signal to the worker failed.
    #[error("failed to signal worker: {source}")]
    Signal {
        /// Underlying errno.
        #[source]
        source: nix::Error,
    },
}

impl LoopError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        LoopError::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use loopvisor::LoopError;
    /// use std::time::Duration;
    ///
    /// let err = LoopError::StopTimeout { pid: 42, grace: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "loop_stop_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LoopError::WorkerFailed { .. } => "loop_worker_failed",
            LoopError::WorkerCrashed { .. } => "loop_worker_crashed",
            LoopError::StopTimeout { .. } => "loop_stop_timeout",
            LoopError::InvalidConfiguration { .. } => "loop_invalid_configuration",
            LoopError::SlotOutOfRange { .. } => "loop_slot_out_of_range",
            LoopError::Spawn { .. } => "loop_spawn",
            LoopError::Signal { .. } => "loop_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LoopError::WorkerFailed { pid, code } => format!("worker pid={pid} exit={code}"),
            LoopError::WorkerCrashed { pid, signal } => format!("worker pid={pid} signal={signal}"),
            LoopError::StopTimeout { pid, grace } => {
                format!("worker pid={pid} ignored stop for {grace:?}")
            }
            LoopError::InvalidConfiguration { reason } => format!("config: {reason}"),
            LoopError::SlotOutOfRange { index, len } => format!("slot {index} of {len}"),
            LoopError::Spawn { source } => format!("spawn: {source}"),
            LoopError::Signal { source } => format!("signal: {source}"),
        }
    }

    /// Indicates whether the error reports a failure of the worker itself
    /// (as opposed to a problem on the owner side).
    ///
    /// # Example
    /// ```
    /// use loopvisor::LoopError;
    ///
    /// assert!(LoopError::WorkerFailed { pid: 1, code: 1 }.is_worker_failure());
    /// let cfg = LoopError::InvalidConfiguration { reason: "nope".into() };
    /// assert!(!cfg.is_worker_failure());
    /// ```
    pub fn is_worker_failure(&self) -> bool {
        matches!(
            self,
            LoopError::WorkerFailed { .. } | LoopError::WorkerCrashed { .. }
        )
    }
}

/// # Errors produced by one tick of the work callable.
///
/// Any of these ends the worker with a failure status; the owner sees
/// [`LoopError::WorkerFailed`] at its next lifecycle call.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkError {
    /// The callable returned an error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The callable panicked.
    #[error("panicked: {message}")]
    Panicked {
        /// The panic payload, when it was a string.
        message: String,
    },
}

impl WorkError {
    /// Builds a [`WorkError::Fail`] from anything displayable.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        WorkError::Fail {
            error: error.to_string(),
        }
    }

    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        WorkError::Panicked { message }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use loopvisor::WorkError;
    ///
    /// assert_eq!(WorkError::fail("boom").as_label(), "work_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Fail { .. } => "work_failed",
            WorkError::Panicked { .. } => "work_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkError::Fail { error } => format!("error: {error}"),
            WorkError::Panicked { message } => format!("panic: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_captured() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static str");
        let err = WorkError::from_panic(boxed.as_ref());
        assert_eq!(err.as_message(), "panic: static str");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(WorkError::from_panic(boxed.as_ref()).as_message(), "panic: owned");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(17u8);
        assert_eq!(
            WorkError::from_panic(boxed.as_ref()).as_label(),
            "work_panicked"
        );
    }

    #[test]
    fn display_mentions_pid() {
        let err = LoopError::WorkerFailed { pid: 321, code: 1 };
        assert_eq!(err.to_string(), "worker 321 failed (exit status 1)");
    }
}
