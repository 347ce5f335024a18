//! Signature validation node.
//!
//! Validates the submitted signature shape before any chain interaction,
//! then waits for chain-level confirmation of the transaction it identifies.
//! A reverted transaction is a hard failure, not a retryable condition:
//! resubmission risk (double spend, nonce reuse) is the caller's decision.

use std::sync::Arc;

use async_trait::async_trait;
use chainflow_core::{ChainflowError, Result, TaskStatus};
use chainflow_rpc::ConfirmationWaiter;
use tracing::{debug, info};

use crate::data::{NodeInput, NodeName, NodeOutput, StakePhase};
use crate::node::Node;

/// Minimum accepted signature length. Anything shorter is rejected as
/// malformed before the chain is contacted.
pub const MIN_SIGNATURE_LEN: usize = 64;

/// Validates signatures and waits for transaction confirmation.
pub struct SignatureValidatorNode {
    waiter: Arc<ConfirmationWaiter>,
}

impl SignatureValidatorNode {
    pub fn new(waiter: Arc<ConfirmationWaiter>) -> Self {
        Self { waiter }
    }
}

#[async_trait]
impl Node for SignatureValidatorNode {
    fn name(&self) -> NodeName {
        NodeName::SignatureValidator
    }

    async fn execute(&self, mut input: NodeInput) -> Result<NodeOutput> {
        let signature = input.data.signature.take().ok_or_else(|| {
            ChainflowError::Internal("signature not found in input".to_string())
        })?;

        if signature.len() < MIN_SIGNATURE_LEN {
            return Err(ChainflowError::MalformedSignature {
                len: signature.len(),
                min: MIN_SIGNATURE_LEN,
            });
        }

        let task_id = input.data.pending_task.take().ok_or_else(|| {
            ChainflowError::Internal("no pending task for submitted signature".to_string())
        })?;

        // The signature doubles as the submitted transaction id.
        debug!(task = %task_id, tx = %signature, "waiting for confirmation");
        let receipt = self.waiter.wait(&signature).await?;
        info!(
            task = %task_id,
            block = receipt.block_number,
            simulated = receipt.simulated,
            "transaction confirmed"
        );

        match input.data.stake_phase.remove(&task_id) {
            Some(StakePhase::Approve) => {
                // Allowance confirmed; route back into the stake executor
                // for the actual stake payload.
                input.data.approved.push(task_id.clone());
                input
                    .data
                    .approve_txs
                    .insert(task_id.clone(), signature.clone());
                input.data.set_task_status(&task_id, TaskStatus::Pending);
                info!(task = %task_id, "allowance confirmed, returning to stake executor");
                Ok(NodeOutput::next(input.data, NodeName::StakeExecutor))
            }
            Some(StakePhase::Stake) | None => {
                input.data.record_confirmed(&task_id, &signature);
                let next = input
                    .data
                    .dependent_node(&task_id)
                    .unwrap_or(NodeName::ResultAggregator);
                debug!(task = %task_id, next = %next, "task confirmed");
                Ok(NodeOutput::next(input.data, next))
            }
        }
    }
}
