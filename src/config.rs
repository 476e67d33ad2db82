//! # Loop configuration.
//!
//! [`LoopConfig`] defines how a supervised worker behaves: tick interval,
//! stop grace period, signal policies, kill escalation and pause behavior.
//!
//! A config is immutable while the worker runs: the worker process gets its
//! own copy at [`Loop::start`](crate::Loop::start). Changing it requires
//! `stop()`, reconfiguring, and `start()` again.
//!
//! ## Sentinel values
//! - `interval = 0s` → ticks run back to back (no sleep in between)

use std::time::Duration;

use crate::error::LoopError;
use crate::policies::{ControlSignal, SignalPolicy};

/// Configuration for a supervised loop worker.
///
/// ## Field semantics
/// - `interval`: time between the starts of two ticks (`0s` = back to back)
/// - `grace`: how long `stop()` waits for the worker to exit
/// - `sigint` / `sigterm`: worker reaction to interrupt / terminate
/// - `auto_kill_on_last_resort`: escalate to `SIGKILL` when `grace` elapses
/// - `run_on_resume`: tick immediately after `resume()` instead of waiting an interval
/// - `name`: label used in logs
#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Time between the starts of two consecutive ticks.
    pub interval: Duration,

    /// Maximum time `stop()` blocks waiting for the worker to exit.
    ///
    /// When it elapses:
    /// - with `auto_kill_on_last_resort` the worker is killed;
    /// - otherwise `stop()` returns [`LoopError::StopTimeout`] and the worker keeps running.
    pub grace: Duration,

    /// Worker reaction to `SIGINT`.
    pub sigint: SignalPolicy,

    /// Worker reaction to `SIGTERM` (also used by the owner's `stop()`).
    pub sigterm: SignalPolicy,

    /// Kill the worker when it outlives the grace period of `stop()`.
    pub auto_kill_on_last_resort: bool,

    /// Whether a resumed worker ticks immediately (`true`) or first waits one interval.
    pub run_on_resume: bool,

    /// Label used in log records.
    pub name: String,
}

impl Default for LoopConfig {
    /// Default configuration:
    ///
    /// - `interval = 1s`
    /// - `grace = 1s`
    /// - `sigint = sigterm = SignalPolicy::Stop`
    /// - `auto_kill_on_last_resort = false`
    /// - `run_on_resume = true`
    /// - `name = "loop"`
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            grace: Duration::from_secs(1),
            sigint: SignalPolicy::Stop,
            sigterm: SignalPolicy::Stop,
            auto_kill_on_last_resort: false,
            run_on_resume: true,
            name: "loop".to_string(),
        }
    }
}

impl LoopConfig {
    /// Returns a config with the given interval and defaults otherwise.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Sets the interval from fractional seconds.
    ///
    /// Fails with [`LoopError::InvalidConfiguration`] for negative or non-finite values.
    ///
    /// # Example
    /// ```
    /// use loopvisor::LoopConfig;
    /// use std::time::Duration;
    ///
    /// let cfg = LoopConfig::default().with_interval_secs(0.25).unwrap();
    /// assert_eq!(cfg.interval, Duration::from_millis(250));
    /// assert!(LoopConfig::default().with_interval_secs(-1.0).is_err());
    /// ```
    pub fn with_interval_secs(mut self, secs: f64) -> Result<Self, LoopError> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(LoopError::invalid(format!(
                "interval must be a finite number of seconds >= 0, got {secs}"
            )));
        }
        self.interval = Duration::from_secs_f64(secs);
        Ok(self)
    }

    /// Returns a new config with updated interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Returns a new config with updated grace period.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Returns a new config with updated `SIGINT` policy.
    pub fn with_sigint(mut self, policy: SignalPolicy) -> Self {
        self.sigint = policy;
        self
    }

    /// Returns a new config with updated `SIGTERM` policy.
    pub fn with_sigterm(mut self, policy: SignalPolicy) -> Self {
        self.sigterm = policy;
        self
    }

    /// Returns a new config with kill escalation switched on or off.
    pub fn with_auto_kill(mut self, enabled: bool) -> Self {
        self.auto_kill_on_last_resort = enabled;
        self
    }

    /// Returns a new config with updated resume behavior.
    pub fn with_run_on_resume(mut self, enabled: bool) -> Self {
        self.run_on_resume = enabled;
        self
    }

    /// Returns a new config with updated log label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the policy configured for `signal`.
    pub fn policy(&self, signal: ControlSignal) -> &SignalPolicy {
        match signal {
            ControlSignal::Interrupt => &self.sigint,
            ControlSignal::Terminate => &self.sigterm,
        }
    }

    /// Returns the interval as an `Option`.
    ///
    /// - `None` → no sleep between ticks
    /// - `Some(d)` → ticks start `d` apart
    #[inline]
    pub fn sleep_interval(&self) -> Option<Duration> {
        if self.interval == Duration::ZERO {
            None
        } else {
            Some(self.interval)
        }
    }
}
