//! Terminal result aggregation node.

use async_trait::async_trait;
use chainflow_core::Result;
use serde_json::json;
use tracing::info;

use crate::data::{NodeInput, NodeName, NodeOutput};
use crate::node::Node;

/// Folds per-task outcomes into the final workflow response.
pub struct ResultAggregatorNode;

#[async_trait]
impl Node for ResultAggregatorNode {
    fn name(&self) -> NodeName {
        NodeName::ResultAggregator
    }

    async fn execute(&self, input: NodeInput) -> Result<NodeOutput> {
        let data = input.data;

        let mut result = json!({
            "status": "completed",
            "workflow_id": input.ids.workflow_id,
            "session_id": input.ids.session_id,
            "user_message": &data.user_message,
            "tasks": &data.tasks,
            "completed_tasks": &data.completed_tasks,
        });

        if let Some(last_tx) = data
            .completed_tasks
            .last()
            .and_then(|id| data.tx_hashes.get(id))
        {
            result["transaction_hash"] = json!(last_tx);
        }
        if !data.tx_hashes.is_empty() {
            result["transaction_hashes"] = json!(data.tx_hashes);
        }
        if !data.approve_txs.is_empty() {
            result["approve_transaction_hashes"] = json!(data.approve_txs);
        }

        info!(tasks = data.completed_tasks.len(), "workflow result aggregated");
        Ok(NodeOutput::done(data, result))
    }
}
