use camino::Utf8PathBuf;
use ltk_overlay_supervisor::SupervisorError;
use ltk_skin_registry::RegistryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credits::CreditError;
use crate::tool::ToolError;

/// Error codes that can be communicated to the UI layer.
/// These are serialized as SCREAMING_SNAKE_CASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The user has no install credit left
    InsufficientCredit,
    /// The credit service could not be reached
    CreditCheckFailed,
    /// No skin is installed for the character
    ModNotFound,
    /// Another install/uninstall/start/stop is in flight
    TransitionConflict,
    /// Archive copy or delete failed
    FileIoFailure,
    /// The archive was written but is empty
    EmptyArchive,
    /// Another character already uses the archive file name
    FileNameConflict,
    /// Registry could not be read or written
    RegistryFailure,
    /// The overlay process could not be launched
    ProcessSpawnFailure,
    /// The overlay did not confirm start in time
    ProcessTimeout,
    /// The overlay exited before it was ready
    ProcessExited,
    /// The mod tool reported a failure
    ToolFailure,
}

/// Structured error sent to the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Machine-readable error code for pattern matching
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional contextual data (e.g., the character id or path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Serialize) -> Self {
        self.context = serde_json::to_value(context).ok();
        self
    }
}

/// Errors returned by [`SkinManager`](crate::SkinManager) operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("No install credits left for user '{user_id}'")]
    InsufficientCredit { user_id: String },

    #[error("Credit check failed: {0}")]
    CreditCheck(#[from] CreditError),

    #[error("No skin installed for '{character_id}'")]
    NotFound { character_id: String },

    #[error("Operation already in progress: {reason}")]
    TransitionConflict { reason: String },

    #[error("File operation failed on {path}: {source}")]
    FileIo {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive {path} is empty")]
    EmptyArchive { path: Utf8PathBuf },

    #[error("Archive name '{file_name}' is already used by '{owner}'")]
    FileNameConflict { file_name: String, owner: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Supervisor(SupervisorError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl From<SupervisorError> for ManagerError {
    fn from(error: SupervisorError) -> Self {
        match error {
            SupervisorError::TransitionConflict { state } => ManagerError::TransitionConflict {
                reason: format!("overlay is {state}"),
            },
            other => ManagerError::Supervisor(other),
        }
    }
}

impl ManagerError {
    pub(crate) fn file_io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ManagerError::InsufficientCredit { .. } => ErrorCode::InsufficientCredit,
            ManagerError::CreditCheck(_) => ErrorCode::CreditCheckFailed,
            ManagerError::NotFound { .. } => ErrorCode::ModNotFound,
            ManagerError::TransitionConflict { .. } => ErrorCode::TransitionConflict,
            ManagerError::FileIo { .. } => ErrorCode::FileIoFailure,
            ManagerError::EmptyArchive { .. } => ErrorCode::EmptyArchive,
            ManagerError::FileNameConflict { .. } => ErrorCode::FileNameConflict,
            ManagerError::Registry(_) => ErrorCode::RegistryFailure,
            ManagerError::Supervisor(SupervisorError::SpawnFailed { .. }) => {
                ErrorCode::ProcessSpawnFailure
            }
            ManagerError::Supervisor(SupervisorError::Timeout { .. }) => ErrorCode::ProcessTimeout,
            ManagerError::Supervisor(SupervisorError::ExitedBeforeReady { .. }) => {
                ErrorCode::ProcessExited
            }
            ManagerError::Supervisor(SupervisorError::TransitionConflict { .. }) => {
                ErrorCode::TransitionConflict
            }
            ManagerError::Tool(_) => ErrorCode::ToolFailure,
        }
    }

    /// The user can fix this (buy credits, pick another skin) rather than retry.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            ManagerError::InsufficientCredit { .. }
                | ManagerError::NotFound { .. }
                | ManagerError::FileNameConflict { .. }
        )
    }

    /// Re-issuing the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ManagerError::CreditCheck(_)
            | ManagerError::FileIo { .. }
            | ManagerError::EmptyArchive { .. }
            | ManagerError::Registry(_)
            | ManagerError::Tool(_) => true,
            ManagerError::Supervisor(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<&ManagerError> for ErrorResponse {
    fn from(error: &ManagerError) -> Self {
        let response = ErrorResponse::new(error.code(), error.to_string());
        match error {
            ManagerError::InsufficientCredit { user_id } => {
                response.with_context(serde_json::json!({ "userId": user_id }))
            }
            ManagerError::NotFound { character_id } => {
                response.with_context(serde_json::json!({ "characterId": character_id }))
            }
            ManagerError::FileIo { path, .. } | ManagerError::EmptyArchive { path } => {
                response.with_context(serde_json::json!({ "path": path }))
            }
            ManagerError::FileNameConflict { file_name, owner } => response.with_context(
                serde_json::json!({ "fileName": file_name, "characterId": owner }),
            ),
            _ => response,
        }
    }
}

impl From<ManagerError> for ErrorResponse {
    fn from(error: ManagerError) -> Self {
        ErrorResponse::from(&error)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_denial_is_user_actionable() {
        let error = ManagerError::InsufficientCredit {
            user_id: "local".to_string(),
        };
        assert!(error.is_user_actionable());
        assert!(!error.is_retryable());

        let response = ErrorResponse::from(&error);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], "INSUFFICIENT_CREDIT");
        assert_eq!(json["context"]["userId"], "local");
    }

    #[test]
    fn test_supervisor_conflict_maps_to_transition_conflict() {
        let error = ManagerError::from(SupervisorError::TransitionConflict {
            state: ltk_overlay_supervisor::OverlayState::Stopping,
        });
        assert_eq!(error.code(), ErrorCode::TransitionConflict);
        assert!(!error.is_retryable());
        assert_eq!(
            error.to_string(),
            "Operation already in progress: overlay is stopping"
        );
    }

    #[test]
    fn test_process_errors_are_retryable() {
        let error = ManagerError::from(SupervisorError::Timeout {
            after: std::time::Duration::from_secs(15),
        });
        assert_eq!(error.code(), ErrorCode::ProcessTimeout);
        assert!(error.is_retryable());
        assert!(!error.is_user_actionable());
    }
}
