//! # Chainflow Contracts
//!
//! The static contract/token registry and the transaction-payload encoder.
//!
//! The registry is loaded once from a JSON document and is read-only
//! afterwards; the encoder is a set of deterministic, side-effect-free
//! functions from typed operation requests to byte-exact [`TxPayload`]s.
//!
//! [`TxPayload`]: chainflow_core::TxPayload

pub mod encoder;
pub mod registry;

pub use encoder::{ClaimRequest, StakeRequest, SwapRequest, TxEncoder};
pub use registry::{ContractInfo, ContractRegistry, SwapMethod, SwapPair, TokenConfig};
