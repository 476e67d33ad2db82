//! Lifecycle state of a supervised worker, as seen by its owner.

use std::fmt;

/// Owner-side lifecycle state of a [`Loop`](crate::Loop).
///
/// ```text
/// Idle ──start()──► Running ◄──resume()── Paused
///                      │  └────pause()────►  │
///                      └──stop()──► Stopping ◄┘
///                                      │
///                    exit 0 / killed ──┴──► Stopped
///                    failure / crash ─────► Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    /// Never started.
    Idle,
    /// Worker is ticking.
    Running,
    /// Worker is alive but suspended.
    Paused,
    /// A stop was requested and the worker has not exited yet.
    Stopping,
    /// Worker exited cleanly or was killed by its owner.
    Stopped,
    /// Worker exited with a failure status or crashed.
    Failed,
}

impl SupervisorState {
    /// Returns `true` while a worker process exists for this state.
    pub fn is_alive(self) -> bool {
        matches!(
            self,
            SupervisorState::Running | SupervisorState::Paused | SupervisorState::Stopping
        )
    }

    /// Returns a lowercase name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Running => "running",
            SupervisorState::Paused => "paused",
            SupervisorState::Stopping => "stopping",
            SupervisorState::Stopped => "stopped",
            SupervisorState::Failed => "failed",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
