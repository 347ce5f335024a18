//! Execution state threaded through the workflow graph.

use std::collections::HashMap;

use chainflow_core::{
    Amount, ChainflowError, Result, SignaturePayload, Task, TaskKind, TaskStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The closed set of nodes in the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeName {
    Decomposer,
    SwapExecutor,
    StakeExecutor,
    SignatureValidator,
    ResultAggregator,
}

impl std::fmt::Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeName::Decomposer => "decomposer",
            NodeName::SwapExecutor => "swap_executor",
            NodeName::StakeExecutor => "stake_executor",
            NodeName::SignatureValidator => "signature_validator",
            NodeName::ResultAggregator => "result_aggregator",
        };
        f.write_str(s)
    }
}

/// Identifiers of the workflow a node runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowIds {
    pub workflow_id: Uuid,
    pub session_id: Uuid,
}

/// Sub-step of the two-phase stake protocol a pending signature belongs to.
///
/// An allowance must exist before the staking contract may pull funds, so a
/// stake task first emits an `approve` payload; the phase marker routes the
/// post-approve resumption back into the stake executor instead of the next
/// graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakePhase {
    Approve,
    Stake,
}

/// The typed data bag threaded between nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionData {
    /// The raw user request.
    pub user_message: String,

    /// Decomposed tasks, in decomposition order.
    pub tasks: Vec<Task>,

    /// Ids of confirmed tasks, in completion order.
    pub completed_tasks: Vec<String>,

    /// Confirmed transaction hash per task id.
    pub tx_hashes: HashMap<String, String>,

    /// Confirmed approve-transaction hash per stake task id.
    pub approve_txs: HashMap<String, String>,

    /// Recorded output quantity per task id, used to resolve
    /// `Amount::UseUpstreamOutput` in dependent tasks.
    pub task_outputs: HashMap<String, String>,

    /// Phase of the in-flight signature per stake task id.
    pub stake_phase: HashMap<String, StakePhase>,

    /// Stake task ids whose allowance is already confirmed.
    pub approved: Vec<String>,

    /// The task the in-flight signature belongs to.
    pub pending_task: Option<String>,

    /// Signature attached by `resume`, consumed by the validator.
    pub signature: Option<String>,
}

impl ExecutionData {
    /// Fresh state for a new workflow.
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ..Self::default()
        }
    }

    /// The first `Pending` task matching `pred` whose dependency (if any) is
    /// confirmed, in decomposition order.
    pub fn next_ready(&self, pred: impl Fn(&TaskKind) -> bool) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|t| pred(&t.kind) && t.is_ready(&self.completed_tasks))
    }

    /// Look up a task by id.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Set a task's status.
    pub fn set_task_status(&mut self, id: &str, status: TaskStatus) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.status = status;
        }
    }

    /// Mark a task confirmed and record its transaction hash.
    pub fn record_confirmed(&mut self, id: &str, tx_hash: &str) {
        self.set_task_status(id, TaskStatus::Confirmed);
        self.completed_tasks.push(id.to_string());
        self.tx_hashes.insert(id.to_string(), tx_hash.to_string());
    }

    /// The executor node for the first pending task depending on `id`, if
    /// one exists.
    pub fn dependent_node(&self, id: &str) -> Option<NodeName> {
        self.tasks
            .iter()
            .find(|t| t.depends_on.as_deref() == Some(id) && t.status == TaskStatus::Pending)
            .map(|t| executor_for(&t.kind))
    }

    /// Resolve an amount to a literal decimal quantity.
    ///
    /// `UseUpstreamOutput` reads the output recorded for the dependency
    /// task; a missing record is an error, never a guessed constant.
    pub fn resolve_amount(&self, depends_on: Option<&str>, amount: &Amount) -> Result<String> {
        match amount {
            Amount::Exact(s) => Ok(s.clone()),
            Amount::UseUpstreamOutput => {
                let dep = depends_on.ok_or_else(|| {
                    ChainflowError::Decomposition(
                        "amount references upstream output but the task has no dependency"
                            .to_string(),
                    )
                })?;
                self.task_outputs.get(dep).cloned().ok_or_else(|| {
                    ChainflowError::Internal(format!("no output recorded for upstream task {dep}"))
                })
            }
        }
    }
}

/// Which executor node handles a task kind.
pub fn executor_for(kind: &TaskKind) -> NodeName {
    match kind {
        TaskKind::Swap { .. } => NodeName::SwapExecutor,
        TaskKind::Stake { .. } | TaskKind::Unstake { .. } | TaskKind::Claim { .. } => {
            NodeName::StakeExecutor
        }
    }
}

/// Input to a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInput {
    pub data: ExecutionData,
    pub ids: WorkflowIds,
}

/// Output of a node.
///
/// `needs_user_auth` and `completed` are mutually exclusive terminal
/// signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeOutput {
    pub data: ExecutionData,
    pub next_node: Option<NodeName>,
    pub needs_user_auth: bool,
    pub auth_request: Option<SignaturePayload>,
    pub completed: bool,
    pub result: Option<Value>,
}

impl NodeOutput {
    /// Continue to `next`.
    pub fn next(data: ExecutionData, next: NodeName) -> Self {
        Self {
            data,
            next_node: Some(next),
            needs_user_auth: false,
            auth_request: None,
            completed: false,
            result: None,
        }
    }

    /// Suspend for an external signature; resumption re-enters at `next`.
    pub fn suspend(data: ExecutionData, next: NodeName, payload: SignaturePayload) -> Self {
        Self {
            data,
            next_node: Some(next),
            needs_user_auth: true,
            auth_request: Some(payload),
            completed: false,
            result: None,
        }
    }

    /// Terminal output with the final result.
    pub fn done(data: ExecutionData, result: Value) -> Self {
        Self {
            data,
            next_node: None,
            needs_user_auth: false,
            auth_request: None,
            completed: true,
            result: Some(result),
        }
    }
}

/// The suspended-execution snapshot.
///
/// Exists only while a session is awaiting a signature; owned exclusively by
/// the session that created it and replaced the moment resumption succeeds.
/// Carries the full pre-suspension output, not just a task id: resumption
/// re-enters edge resolution as if the node had just produced that output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub current_node: NodeName,
    pub output: NodeOutput,
    pub input: NodeInput,
}

/// Result of executing or resuming a workflow.
#[derive(Debug)]
pub enum WorkflowResult {
    /// Execution is suspended; the caller must obtain a signature for
    /// `payload` and call `resume` with `context`.
    NeedsSignature {
        payload: SignaturePayload,
        context: Box<WorkflowContext>,
    },
    /// The workflow finished.
    Done(Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap(id: &str) -> Task {
        Task::new(
            id,
            TaskKind::Swap {
                from_token: "MEER".into(),
                to_token: "MTK".into(),
                amount: Amount::exact("10"),
            },
        )
    }

    #[test]
    fn test_next_ready_respects_dependencies() {
        let mut data = ExecutionData::new("test");
        data.tasks = vec![swap("task_1"), swap("task_2").depends_on("task_1")];

        let ready = data.next_ready(|_| true).unwrap();
        assert_eq!(ready.id, "task_1");

        data.record_confirmed("task_1", "0xabc");
        let ready = data.next_ready(|_| true).unwrap();
        assert_eq!(ready.id, "task_2");
    }

    #[test]
    fn test_dependent_node_routes_by_kind() {
        let mut data = ExecutionData::new("test");
        let stake = Task::new(
            "task_2",
            TaskKind::Stake {
                token: "MTK".into(),
                amount: Amount::UseUpstreamOutput,
                pool: "compound".into(),
            },
        )
        .depends_on("task_1");
        data.tasks = vec![swap("task_1"), stake];

        assert_eq!(data.dependent_node("task_1"), Some(NodeName::StakeExecutor));
        assert_eq!(data.dependent_node("task_2"), None);
    }

    #[test]
    fn test_resolve_amount_requires_recorded_output() {
        let mut data = ExecutionData::new("test");
        let err = data
            .resolve_amount(Some("task_1"), &Amount::UseUpstreamOutput)
            .unwrap_err();
        assert!(matches!(err, ChainflowError::Internal(_)));

        data.task_outputs.insert("task_1".into(), "10000".into());
        let resolved = data
            .resolve_amount(Some("task_1"), &Amount::UseUpstreamOutput)
            .unwrap();
        assert_eq!(resolved, "10000");
    }

    #[test]
    fn test_resolve_amount_without_dependency_is_decomposition_error() {
        let data = ExecutionData::new("test");
        let err = data
            .resolve_amount(None, &Amount::UseUpstreamOutput)
            .unwrap_err();
        assert!(matches!(err, ChainflowError::Decomposition(_)));
    }
}
