//! Error types for Chainflow.

use thiserror::Error;
use uuid::Uuid;

use crate::types::SessionStatus;

/// Main error type for Chainflow operations.
#[derive(Error, Debug, Clone)]
pub enum ChainflowError {
    /// The user request could not be decomposed into tasks.
    #[error("task decomposition failed: {0}")]
    Decomposition(String),

    /// The requested trading pair is not in the registry.
    #[error("unsupported trading pair: {from} -> {to}")]
    UnsupportedPair { from: String, to: String },

    /// A contract referenced by an operation is missing from the registry.
    #[error("contract not found in registry: {0}")]
    UnknownContract(String),

    /// A token referenced by an operation is missing from the registry.
    #[error("token not found in registry: {0}")]
    UnknownToken(String),

    /// An amount string could not be converted to base units.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A submitted signature failed validation before any chain interaction.
    #[error("malformed signature: {len} chars, minimum is {min}")]
    MalformedSignature { len: usize, min: usize },

    /// The transaction was included but its execution reverted.
    #[error("transaction reverted on chain: {tx_hash}")]
    TransactionReverted { tx_hash: String },

    /// Confirmation polling exceeded the configured timeout.
    #[error("confirmation timed out after {timeout_secs}s: {tx_hash}")]
    ConfirmationTimeout { tx_hash: String, timeout_secs: u64 },

    /// A chain RPC call failed.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The language-model client returned an error.
    #[error("llm error: {0}")]
    Llm(String),

    /// No language-model client is configured.
    #[error("no language model client configured")]
    LlmUnavailable,

    /// No session exists for the given id.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// The session is not in the state the requested action requires.
    #[error("session {id} is {actual}, expected {expected}")]
    InvalidSessionState {
        id: Uuid,
        expected: SessionStatus,
        actual: SessionStatus,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChainflowError {
    /// Returns true if retrying the same operation may succeed.
    ///
    /// Receipt lookups and other RPC failures are transient; a reverted
    /// transaction or a bad payload is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainflowError::Rpc(_) | ChainflowError::Llm(_))
    }
}

/// Convenience Result type for Chainflow operations.
pub type Result<T> = std::result::Result<T, ChainflowError>;

impl From<serde_json::Error> for ChainflowError {
    fn from(err: serde_json::Error) -> Self {
        ChainflowError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(ChainflowError::Rpc("connection refused".into()).is_transient());
        assert!(!ChainflowError::TransactionReverted {
            tx_hash: "0xabc".into()
        }
        .is_transient());
        assert!(!ChainflowError::InvalidAmount("abc".into()).is_transient());
    }

    #[test]
    fn test_invalid_state_message() {
        let err = ChainflowError::InvalidSessionState {
            id: Uuid::nil(),
            expected: SessionStatus::AwaitingSignature,
            actual: SessionStatus::Completed,
        };
        let msg = err.to_string();
        assert!(msg.contains("completed"));
        assert!(msg.contains("awaiting_signature"));
    }
}
