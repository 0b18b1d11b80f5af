//! Error types for overlay supervision.

use std::time::Duration;

use thiserror::Error;

use crate::supervisor::OverlayState;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Errors returned by [`Supervisor`](crate::Supervisor) operations.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// Another start or stop is still in flight.
    #[error("Overlay operation already in progress (state: {state})")]
    TransitionConflict { state: OverlayState },

    /// The overlay executable could not be launched.
    #[error("Failed to spawn overlay process '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited before printing the ready marker.
    #[error("Overlay exited before it was ready{}", describe_exit_code(.exit_code))]
    ExitedBeforeReady { exit_code: Option<i32> },

    /// The ready marker did not appear in time; the process was killed.
    #[error("Timed out after {after:?} waiting for overlay confirmation")]
    Timeout { after: Duration },
}

impl SupervisorError {
    /// Whether re-issuing `start` may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SpawnFailed { .. } | Self::ExitedBeforeReady { .. } | Self::Timeout { .. }
        )
    }
}

fn describe_exit_code(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!(" (exit code {code})"),
        None => String::new(),
    }
}
