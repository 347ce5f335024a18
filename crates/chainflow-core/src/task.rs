//! Task types produced by decomposition.
//!
//! A task is one atomic on-chain operation. The dependency graph among the
//! tasks of a workflow is a forest: each task carries at most one
//! `dependency_tx_id` pointer, so readiness resolution is a linear scan in
//! decomposition order.

use serde::{Deserialize, Serialize};

/// Wire sentinel for "substitute the literal quantity produced by the
/// dependency task".
pub const UPSTREAM_OUTPUT_SENTINEL: &str = "all_from_previous";

/// An amount field of a task. Resolved at execution time, not at
/// decomposition time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Amount {
    /// A literal decimal quantity, e.g. `"10"` or `"0.5"`.
    Exact(String),
    /// Use the output quantity recorded for the dependency task.
    UseUpstreamOutput,
}

impl From<String> for Amount {
    fn from(s: String) -> Self {
        if s == UPSTREAM_OUTPUT_SENTINEL {
            Amount::UseUpstreamOutput
        } else {
            Amount::Exact(s)
        }
    }
}

impl From<Amount> for String {
    fn from(a: Amount) -> Self {
        match a {
            Amount::Exact(s) => s,
            Amount::UseUpstreamOutput => UPSTREAM_OUTPUT_SENTINEL.to_string(),
        }
    }
}

impl Amount {
    /// Create an exact amount from a decimal string.
    pub fn exact(s: impl Into<String>) -> Self {
        Amount::Exact(s.into())
    }
}

/// The operation a task performs, with its typed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    /// Exchange `amount` of `from_token` for `to_token`.
    Swap {
        from_token: String,
        to_token: String,
        amount: Amount,
    },
    /// Stake `amount` of `token` into `pool`.
    Stake {
        token: String,
        amount: Amount,
        #[serde(default = "default_pool")]
        pool: String,
    },
    /// Withdraw `amount` of `token` from the staking contract.
    Unstake { token: String, amount: Amount },
    /// Claim accumulated staking rewards for `token`.
    Claim { token: String },
}

fn default_pool() -> String {
    "compound".to_string()
}

impl TaskKind {
    /// The amount parameter, if this operation has one.
    pub fn amount(&self) -> Option<&Amount> {
        match self {
            TaskKind::Swap { amount, .. }
            | TaskKind::Stake { amount, .. }
            | TaskKind::Unstake { amount, .. } => Some(amount),
            TaskKind::Claim { .. } => None,
        }
    }
}

/// Execution status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet started.
    #[default]
    Pending,
    /// Selected by an executor node; payload being built.
    Executing,
    /// Payload emitted; waiting for the external signature.
    AwaitingSignature,
    /// Signed, submitted and confirmed on chain.
    Confirmed,
    /// Failed terminally.
    Failed,
}

impl TaskStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Confirmed | TaskStatus::Failed)
    }
}

/// One atomic on-chain operation produced by decomposition.
///
/// Serializes flat (`{"id": ..., "type": "swap", "from_token": ...}`) to
/// match the format the decomposition prompt asks the model for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier assigned at decomposition time (`task_1`, `task_2`, ...).
    pub id: String,

    /// The operation and its parameters.
    #[serde(flatten)]
    pub kind: TaskKind,

    /// Id of the task that must be `Confirmed` before this one may start.
    #[serde(default, rename = "dependency_tx_id")]
    pub depends_on: Option<String>,

    /// Current execution status. Not part of the decomposition wire format.
    #[serde(default)]
    pub status: TaskStatus,

    /// Human-readable description for display.
    #[serde(default)]
    pub description: String,
}

impl Task {
    /// Create a pending task.
    pub fn new(id: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            id: id.into(),
            kind,
            depends_on: None,
            status: TaskStatus::Pending,
            description: String::new(),
        }
    }

    /// Set the dependency pointer.
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on = Some(id.into());
        self
    }

    /// Set the display description.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Whether this task may transition out of `Pending`, given the set of
    /// confirmed task ids.
    pub fn is_ready(&self, confirmed: &[String]) -> bool {
        if self.status != TaskStatus::Pending {
            return false;
        }
        match &self.depends_on {
            None => true,
            Some(dep) => confirmed.iter().any(|c| c == dep),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap_kind() -> TaskKind {
        TaskKind::Swap {
            from_token: "MEER".into(),
            to_token: "MTK".into(),
            amount: Amount::exact("10"),
        }
    }

    #[test]
    fn test_task_wire_format() {
        let task = Task::new("task_1", swap_kind());
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "swap");
        assert_eq!(json["from_token"], "MEER");
        assert_eq!(json["amount"], "10");
        assert_eq!(json["dependency_tx_id"], serde_json::Value::Null);
    }

    #[test]
    fn test_upstream_sentinel_roundtrip() {
        let json = r#"{
            "id": "task_2",
            "type": "stake",
            "token": "MTK",
            "amount": "all_from_previous",
            "pool": "compound",
            "dependency_tx_id": "task_1"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.depends_on.as_deref(), Some("task_1"));
        match &task.kind {
            TaskKind::Stake { amount, .. } => assert_eq!(*amount, Amount::UseUpstreamOutput),
            other => panic!("unexpected kind: {other:?}"),
        }
        let back = serde_json::to_value(&task).unwrap();
        assert_eq!(back["amount"], UPSTREAM_OUTPUT_SENTINEL);
    }

    #[test]
    fn test_readiness_requires_confirmed_dependency() {
        let task = Task::new("task_2", swap_kind()).depends_on("task_1");
        assert!(!task.is_ready(&[]));
        assert!(task.is_ready(&["task_1".to_string()]));
    }

    #[test]
    fn test_non_pending_task_is_not_ready() {
        let mut task = Task::new("task_1", swap_kind());
        task.status = TaskStatus::Confirmed;
        assert!(!task.is_ready(&[]));
    }
}
