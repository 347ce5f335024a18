//! Common types used across Chainflow.

use serde::{Deserialize, Serialize};

/// Status of a workflow session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session has been created; execution has not started yet.
    Pending,
    /// The workflow is executing.
    Running,
    /// Execution is suspended, waiting for an external signature.
    AwaitingSignature,
    /// The workflow finished successfully.
    Completed,
    /// The workflow failed and cannot be recovered.
    Failed,
    /// The session was cancelled by the client.
    Cancelled,
}

impl SessionStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }

    /// Returns true if the session is currently being processed.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionStatus::Pending | SessionStatus::Running | SessionStatus::AwaitingSignature
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Running => "running",
            SessionStatus::AwaitingSignature => "awaiting_signature",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_terminal() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::AwaitingSignature.is_terminal());
    }

    #[test]
    fn test_session_status_active() {
        assert!(SessionStatus::Running.is_active());
        assert!(SessionStatus::AwaitingSignature.is_active());
        assert!(!SessionStatus::Completed.is_active());
    }

    #[test]
    fn test_session_status_wire_format() {
        let json = serde_json::to_string(&SessionStatus::AwaitingSignature).unwrap();
        assert_eq!(json, "\"awaiting_signature\"");
    }
}
