//! The node execution seam.

use async_trait::async_trait;
use chainflow_core::Result;

use crate::data::{NodeInput, NodeName, NodeOutput};

/// A unit of execution logic in the workflow graph.
#[async_trait]
pub trait Node: Send + Sync {
    /// This node's name in the graph.
    fn name(&self) -> NodeName;

    /// Run the node over the current execution state.
    async fn execute(&self, input: NodeInput) -> Result<NodeOutput>;
}
