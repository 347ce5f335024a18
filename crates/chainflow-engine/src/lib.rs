//! # Chainflow Engine
//!
//! The task graph engine. A workflow is executed as a named set of nodes
//! over a decomposed task list; after every node an edge-resolution step
//! decides whether to suspend for an external signature, finish, or route to
//! the next node. Suspension captures the full pre-suspension state into a
//! [`WorkflowContext`] so that resumption re-enters the graph exactly where
//! it paused.
//!
//! Within one workflow execution is strictly sequential: one node at a time,
//! no fan-out.

pub mod aggregate;
pub mod data;
pub mod decompose;
pub mod execute;
pub mod graph;
pub mod node;
pub mod validate;

pub use data::{
    ExecutionData, NodeInput, NodeName, NodeOutput, StakePhase, WorkflowContext, WorkflowIds,
    WorkflowResult,
};
pub use graph::WorkflowEngine;
pub use node::Node;
pub use validate::MIN_SIGNATURE_LEN;
