//! # Chainflow RPC
//!
//! JSON-RPC chain client and the confirmation waiter.
//!
//! The waiter blocks its own task for a bounded duration while polling for a
//! transaction receipt; with no endpoint configured it degrades to a
//! fixed-delay simulated confirmation for local/demo execution.

pub mod client;
pub mod confirm;

pub use client::{RpcClient, TransactionReceipt};
pub use confirm::{ConfirmationPolicy, ConfirmationWaiter, Receipt};
