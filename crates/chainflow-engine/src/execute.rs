//! Transaction executor nodes.
//!
//! Each executor selects the next ready task of its kind, builds the
//! transaction payload, and suspends for the user signature. The stake
//! executor runs a two-phase sub-protocol: the allowance (`approve`) must be
//! signed and confirmed before the stake payload is even constructed.

use async_trait::async_trait;
use chainflow_core::{
    ChainflowError, Result, SignaturePayload, TaskKind, TaskStatus, TxAction,
};
use chainflow_contracts::{ClaimRequest, StakeRequest, SwapRequest, TxEncoder};
use tracing::{debug, info};

use crate::data::{NodeInput, NodeName, NodeOutput, StakePhase};
use crate::node::Node;

/// Builds swap payloads.
pub struct SwapExecutorNode {
    encoder: TxEncoder,
}

impl SwapExecutorNode {
    pub fn new(encoder: TxEncoder) -> Self {
        Self { encoder }
    }
}

#[async_trait]
impl Node for SwapExecutorNode {
    fn name(&self) -> NodeName {
        NodeName::SwapExecutor
    }

    async fn execute(&self, mut input: NodeInput) -> Result<NodeOutput> {
        let (task_id, depends_on, from_token, to_token, amount) = {
            let task = input
                .data
                .next_ready(|k| matches!(k, TaskKind::Swap { .. }))
                .ok_or_else(|| {
                    ChainflowError::Internal("no executable swap task".to_string())
                })?;
            let TaskKind::Swap {
                from_token,
                to_token,
                amount,
            } = &task.kind
            else {
                unreachable!("next_ready filtered on swap kind");
            };
            (
                task.id.clone(),
                task.depends_on.clone(),
                from_token.clone(),
                to_token.clone(),
                amount.clone(),
            )
        };

        input.data.set_task_status(&task_id, TaskStatus::Executing);
        let resolved = input.data.resolve_amount(depends_on.as_deref(), &amount)?;

        let req = SwapRequest {
            from_token: from_token.clone(),
            to_token: to_token.clone(),
            amount: resolved.clone(),
        };
        let tx = self.encoder.build_swap(&req)?;

        // Record the expected output now so a dependent task can resolve
        // "all_from_previous" once this one confirms.
        let expected = self.encoder.expected_swap_output(&req)?;
        input.data.task_outputs.insert(task_id.clone(), expected);

        info!(task = %task_id, from = %from_token, to = %to_token, amount = %resolved, "swap payload ready, awaiting signature");
        input
            .data
            .set_task_status(&task_id, TaskStatus::AwaitingSignature);
        input.data.pending_task = Some(task_id);

        let mut payload = SignaturePayload::new(TxAction::Swap, tx);
        payload.from_token = Some(from_token);
        payload.to_token = Some(to_token);
        payload.amount = Some(resolved);
        payload.slippage = Some("0.5%".to_string());

        Ok(NodeOutput::suspend(
            input.data,
            NodeName::SignatureValidator,
            payload,
        ))
    }
}

/// Builds stake, unstake, claim and the prerequisite approve payloads.
pub struct StakeExecutorNode {
    encoder: TxEncoder,
}

impl StakeExecutorNode {
    pub fn new(encoder: TxEncoder) -> Self {
        Self { encoder }
    }

    fn approve_payload(
        &self,
        req: &StakeRequest,
    ) -> Result<SignaturePayload> {
        let tx = self.encoder.build_approve(req)?;
        let mut payload = SignaturePayload::new(TxAction::Approve, tx);
        payload.token = Some(req.token.clone());
        payload.amount = Some(req.amount.clone());
        payload.title = Some(format!("{} allowance - staking preparation", req.token));
        payload.description = Some(format!(
            "Allow the staking contract to use {} {}",
            req.amount, req.token
        ));
        payload.step_info = Some("step 1/2: approve token allowance".to_string());
        Ok(payload)
    }

    fn stake_payload(&self, req: &StakeRequest, pool: &str) -> Result<SignaturePayload> {
        let tx = self.encoder.build_stake(req)?;
        let mut payload = SignaturePayload::new(TxAction::Stake, tx);
        payload.token = Some(req.token.clone());
        payload.amount = Some(req.amount.clone());
        payload.pool = Some(pool.to_string());
        payload.title = Some(format!("{} staking", req.token));
        payload.description = Some(format!("Stake {} {} into {pool}", req.amount, req.token));
        payload.step_info = Some("step 2/2: execute stake".to_string());
        Ok(payload)
    }
}

#[async_trait]
impl Node for StakeExecutorNode {
    fn name(&self) -> NodeName {
        NodeName::StakeExecutor
    }

    async fn execute(&self, mut input: NodeInput) -> Result<NodeOutput> {
        let (task_id, depends_on, kind) = {
            let task = input
                .data
                .next_ready(|k| {
                    matches!(
                        k,
                        TaskKind::Stake { .. } | TaskKind::Unstake { .. } | TaskKind::Claim { .. }
                    )
                })
                .ok_or_else(|| {
                    ChainflowError::Internal("no executable staking task".to_string())
                })?;
            (task.id.clone(), task.depends_on.clone(), task.kind.clone())
        };

        input.data.set_task_status(&task_id, TaskStatus::Executing);

        let payload = match &kind {
            TaskKind::Stake { token, amount, pool } => {
                let resolved = input.data.resolve_amount(depends_on.as_deref(), amount)?;
                let req = StakeRequest {
                    token: token.clone(),
                    amount: resolved,
                };
                if !input.data.approved.contains(&task_id) {
                    // Allowance first; the phase marker routes the
                    // post-approve confirmation back here.
                    debug!(task = %task_id, "allowance missing, emitting approve payload first");
                    input
                        .data
                        .stake_phase
                        .insert(task_id.clone(), StakePhase::Approve);
                    self.approve_payload(&req)?
                } else {
                    input
                        .data
                        .stake_phase
                        .insert(task_id.clone(), StakePhase::Stake);
                    self.stake_payload(&req, pool)?
                }
            }
            TaskKind::Unstake { token, amount } => {
                let resolved = input.data.resolve_amount(depends_on.as_deref(), amount)?;
                let req = StakeRequest {
                    token: token.clone(),
                    amount: resolved.clone(),
                };
                let tx = self.encoder.build_unstake(&req)?;
                let mut payload = SignaturePayload::new(TxAction::Unstake, tx);
                payload.token = Some(token.clone());
                payload.amount = Some(resolved);
                payload.description = Some(format!("Withdraw staked {token}"));
                payload
            }
            TaskKind::Claim { token } => {
                let tx = self.encoder.build_claim(&ClaimRequest {
                    token: token.clone(),
                })?;
                let mut payload = SignaturePayload::new(TxAction::Claim, tx);
                payload.token = Some(token.clone());
                payload.description = Some(format!("Claim accumulated {token} staking rewards"));
                payload
            }
            TaskKind::Swap { .. } => {
                unreachable!("next_ready filtered on staking kinds")
            }
        };

        info!(task = %task_id, action = %payload.action, "staking payload ready, awaiting signature");
        input
            .data
            .set_task_status(&task_id, TaskStatus::AwaitingSignature);
        input.data.pending_task = Some(task_id);

        Ok(NodeOutput::suspend(
            input.data,
            NodeName::SignatureValidator,
            payload,
        ))
    }
}
