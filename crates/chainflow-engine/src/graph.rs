//! The workflow graph driver.
//!
//! Runs one node at a time and resolves the outgoing edge after every node:
//! suspend when the node requests user authorization, finish when it reports
//! completion, otherwise follow its routing to the next node.

use std::sync::Arc;

use chainflow_core::{ChainflowError, Result};
use chainflow_contracts::{ContractRegistry, TxEncoder};
use chainflow_llm::LlmClient;
use chainflow_rpc::ConfirmationWaiter;
use tracing::{debug, info};

use crate::aggregate::ResultAggregatorNode;
use crate::data::{
    ExecutionData, NodeInput, NodeName, WorkflowContext, WorkflowIds, WorkflowResult,
};
use crate::decompose::DecomposerNode;
use crate::execute::{StakeExecutorNode, SwapExecutorNode};
use crate::node::Node;
use crate::validate::SignatureValidatorNode;

/// Executes workflows over the fixed node set.
pub struct WorkflowEngine {
    decomposer: DecomposerNode,
    swap_executor: SwapExecutorNode,
    stake_executor: StakeExecutorNode,
    signature_validator: SignatureValidatorNode,
    result_aggregator: ResultAggregatorNode,
}

impl WorkflowEngine {
    /// Wire up the node set over the shared collaborators.
    pub fn new(
        llm: Option<Arc<dyn LlmClient>>,
        registry: Arc<ContractRegistry>,
        waiter: Arc<ConfirmationWaiter>,
    ) -> Self {
        let encoder = TxEncoder::new(registry.clone());
        Self {
            decomposer: DecomposerNode::new(llm, registry),
            swap_executor: SwapExecutorNode::new(encoder.clone()),
            stake_executor: StakeExecutorNode::new(encoder),
            signature_validator: SignatureValidatorNode::new(waiter),
            result_aggregator: ResultAggregatorNode,
        }
    }

    /// Execute a workflow from the raw user message.
    pub async fn execute(&self, message: &str, ids: WorkflowIds) -> Result<WorkflowResult> {
        info!(workflow = %ids.workflow_id, "workflow started");
        let input = NodeInput {
            data: ExecutionData::new(message),
            ids,
        };
        self.run_from(NodeName::Decomposer, input).await
    }

    /// Resume a suspended workflow with the externally obtained signature.
    ///
    /// The signature is attached into the captured output and edge
    /// resolution re-enters exactly where the workflow paused.
    pub async fn resume(
        &self,
        context: WorkflowContext,
        signature: &str,
    ) -> Result<WorkflowResult> {
        let WorkflowContext {
            current_node,
            mut output,
            input,
        } = context;
        info!(resumed_from = %current_node, "resuming workflow with signature");

        output.data.signature = Some(signature.to_string());
        output.needs_user_auth = false;
        output.auth_request = None;

        match output.next_node {
            Some(next) => {
                let next_input = NodeInput {
                    data: output.data,
                    ids: input.ids,
                };
                self.run_from(next, next_input).await
            }
            None => Err(ChainflowError::Internal(
                "suspended context has no continuation node".to_string(),
            )),
        }
    }

    async fn run_from(&self, start: NodeName, mut input: NodeInput) -> Result<WorkflowResult> {
        let mut current = start;
        loop {
            debug!(node = %current, "executing node");
            let snapshot = input.clone();
            let output = self.node(current).execute(input).await?;

            if output.needs_user_auth {
                let payload = output.auth_request.clone().ok_or_else(|| {
                    ChainflowError::Internal(format!(
                        "node {current} requested authorization without a payload"
                    ))
                })?;
                info!(node = %current, action = %payload.action, "suspending for signature");
                let context = WorkflowContext {
                    current_node: current,
                    output,
                    input: snapshot,
                };
                return Ok(WorkflowResult::NeedsSignature {
                    payload,
                    context: Box::new(context),
                });
            }

            if output.completed {
                info!(node = %current, "workflow complete");
                let result = output
                    .result
                    .ok_or_else(|| ChainflowError::Internal("completed without result".into()))?;
                return Ok(WorkflowResult::Done(result));
            }

            match output.next_node {
                Some(next) => {
                    input = NodeInput {
                        data: output.data,
                        ids: snapshot.ids,
                    };
                    current = next;
                }
                None => {
                    // no continuation and not terminal: fold what we have
                    return Ok(WorkflowResult::Done(serde_json::to_value(&output.data)?));
                }
            }
        }
    }

    fn node(&self, name: NodeName) -> &dyn Node {
        match name {
            NodeName::Decomposer => &self.decomposer,
            NodeName::SwapExecutor => &self.swap_executor,
            NodeName::StakeExecutor => &self.stake_executor,
            NodeName::SignatureValidator => &self.signature_validator,
            NodeName::ResultAggregator => &self.result_aggregator,
        }
    }
}
