//! # Chainflow Core
//!
//! Core primitives and types for Chainflow:
//! - [`Task`] - one atomic on-chain operation produced by decomposition
//! - [`TxPayload`] / [`SignaturePayload`] - ready-to-sign transaction descriptors
//! - [`SessionStatus`] - workflow session lifecycle states
//! - [`ChainflowError`] - error types shared across the workspace

pub mod error;
pub mod payload;
pub mod task;
pub mod types;

// Re-exports for convenience
pub use error::{ChainflowError, Result};
pub use payload::{SignaturePayload, TxAction, TxPayload};
pub use task::{Amount, Task, TaskKind, TaskStatus};
pub use types::SessionStatus;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{ChainflowError, Result};
    pub use crate::payload::{SignaturePayload, TxAction, TxPayload};
    pub use crate::task::{Amount, Task, TaskKind, TaskStatus};
    pub use crate::types::SessionStatus;
}
