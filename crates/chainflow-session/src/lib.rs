//! # Chainflow Session
//!
//! One session per user-initiated workflow. The session manager launches
//! each workflow as an independent tokio task, surfaces status through a
//! bounded long-poll channel, and multiplexes many concurrent workflows over
//! a single reader/writer-locked registry.
//!
//! Sessions live in memory for the process lifetime; there is no
//! persistence across restarts.

pub mod manager;
pub mod session;

pub use manager::{PollOutcome, SessionManager, StartedWorkflow};
pub use session::{Session, SessionUpdate, SessionView, UpdateKind};
