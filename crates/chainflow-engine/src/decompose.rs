//! Task decomposition node.
//!
//! Calls the language-model client with a constrained prompt and parses the
//! reply into a task list. A parse failure or a semantically invalid task
//! (unsupported pair, unknown token) falls back to a deterministic keyword
//! parser over the ORIGINAL user text, never over the model's prose, so a
//! bad model response cannot silently invent unsupported parameters.

use std::sync::Arc;

use async_trait::async_trait;
use chainflow_core::{Amount, ChainflowError, Result, Task, TaskKind};
use chainflow_contracts::ContractRegistry;
use chainflow_llm::{ChatMessage, LlmClient};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::data::{executor_for, NodeInput, NodeName, NodeOutput};
use crate::node::Node;

/// Decomposes the raw user request into a task list.
pub struct DecomposerNode {
    llm: Option<Arc<dyn LlmClient>>,
    registry: Arc<ContractRegistry>,
}

#[derive(Deserialize)]
struct DecompositionReply {
    tasks: Vec<Task>,
}

impl DecomposerNode {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, registry: Arc<ContractRegistry>) -> Self {
        Self { llm, registry }
    }

    async fn decompose(&self, message: &str) -> Result<Vec<Task>> {
        let Some(llm) = &self.llm else {
            debug!("no llm client configured, using keyword parser");
            return Ok(fallback_parse(message));
        };

        let prompt = self.build_prompt(message);
        let response = llm.chat(&[ChatMessage::user(prompt)]).await?;
        debug!(chars = response.len(), "model reply received");

        match self.parse_reply(&response) {
            Ok(tasks) => Ok(tasks),
            Err(e) => {
                warn!(error = %e, "model reply rejected, falling back to keyword parser");
                Ok(fallback_parse(message))
            }
        }
    }

    fn parse_reply(&self, response: &str) -> Result<Vec<Task>> {
        let json = extract_json(response).ok_or_else(|| {
            ChainflowError::Decomposition("no JSON object in model reply".to_string())
        })?;
        let reply: DecompositionReply = serde_json::from_str(json)
            .map_err(|e| ChainflowError::Decomposition(format!("bad task JSON: {e}")))?;
        self.validate_tasks(&reply.tasks)?;
        Ok(reply.tasks)
    }

    /// Reject task lists that reference anything outside the registry.
    fn validate_tasks(&self, tasks: &[Task]) -> Result<()> {
        for task in tasks {
            match &task.kind {
                TaskKind::Swap {
                    from_token,
                    to_token,
                    ..
                } => {
                    self.registry.swap_pair(from_token, to_token)?;
                }
                TaskKind::Stake { token, .. }
                | TaskKind::Unstake { token, .. }
                | TaskKind::Claim { token } => {
                    self.registry.token(token)?;
                }
            }
            if let Some(dep) = &task.depends_on {
                if !tasks.iter().any(|t| &t.id == dep) {
                    return Err(ChainflowError::Decomposition(format!(
                        "task {} depends on unknown task {dep}",
                        task.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn build_prompt(&self, message: &str) -> String {
        let tokens = self.registry.supported_tokens().join(", ");
        let pairs = self.registry.supported_pairs().join(", ");
        format!(
            r#"You are a DeFi operation analysis assistant. Decompose the user's request into concrete execution steps.

Supported operation types:
1. swap: token exchange
2. stake: stake tokens to earn rewards
3. unstake: withdraw staked tokens
4. claim: claim accumulated staking rewards

Supported tokens: {tokens}
Supported trading pairs: {pairs}

User request: {message}

Return the decomposition in exactly this JSON shape:

{{
  "tasks": [
    {{
      "id": "task_1",
      "type": "swap",
      "from_token": "MEER",
      "to_token": "MTK",
      "amount": "10",
      "dependency_tx_id": null,
      "description": "swap 10 MEER for MTK"
    }},
    {{
      "id": "task_2",
      "type": "stake",
      "token": "MTK",
      "amount": "all_from_previous",
      "pool": "compound",
      "dependency_tx_id": "task_1",
      "description": "stake the swapped MTK"
    }}
  ]
}}

Rules:
1. Extract token names and amounts from the actual request, never invent them.
2. Only use the supported trading pairs listed above.
3. For consecutive operations (swap then stake), the later task must set dependency_tx_id to the earlier task's id.
4. Every task needs a unique id (task_1, task_2, ...).
5. amount may be "all_from_previous" to use the full output of the dependency task.
6. Independent tasks set dependency_tx_id to null.

Return only JSON, no other text."#
        )
    }
}

#[async_trait]
impl Node for DecomposerNode {
    fn name(&self) -> NodeName {
        NodeName::Decomposer
    }

    async fn execute(&self, mut input: NodeInput) -> Result<NodeOutput> {
        let message = input.data.user_message.clone();
        let tasks = self.decompose(&message).await?;
        if tasks.is_empty() {
            return Err(ChainflowError::Decomposition(format!(
                "no executable operations found in request: {message}"
            )));
        }

        info!(count = tasks.len(), "request decomposed");
        input.data.tasks = tasks;

        let next = input
            .data
            .next_ready(|_| true)
            .map(|t| executor_for(&t.kind))
            .unwrap_or(NodeName::ResultAggregator);
        Ok(NodeOutput::next(input.data, next))
    }
}

/// Extract the first balanced `{...}` span from free text, tolerating
/// surrounding prose and string literals containing braces.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Deterministic keyword parser over the raw user text.
///
/// Recognizes swap/exchange, stake, unstake/withdraw and claim phrasing for
/// the MEER/MTK pair; a swap followed by a stake chains the stake onto the
/// swap's output.
pub fn fallback_parse(message: &str) -> Vec<Task> {
    let lower = message.to_lowercase();
    let mut tasks = Vec::new();
    let mut next_id = 1usize;

    let wants_swap = lower.contains("swap") || lower.contains("exchange");
    let wants_unstake = lower.contains("unstake") || lower.contains("withdraw");
    let wants_claim = lower.contains("claim");
    let wants_stake = contains_plain_stake(&lower);
    let amount = first_number(&lower);

    if wants_swap {
        let (from_token, to_token) = swap_direction(&lower);
        let amount = amount.clone().unwrap_or_else(|| "10".to_string());
        let id = format!("task_{next_id}");
        next_id += 1;
        tasks.push(
            Task::new(
                id,
                TaskKind::Swap {
                    from_token: from_token.to_string(),
                    to_token: to_token.to_string(),
                    amount: Amount::exact(amount.clone()),
                },
            )
            .describe(format!("swap {amount} {from_token} for {to_token}")),
        );
    }

    if wants_stake {
        let id = format!("task_{next_id}");
        next_id += 1;
        let task = if let Some(swap) = tasks.first().cloned() {
            // consecutive operations: stake the swap output
            let to_token = match &swap.kind {
                TaskKind::Swap { to_token, .. } => to_token.clone(),
                _ => "MTK".to_string(),
            };
            Task::new(
                id,
                TaskKind::Stake {
                    token: to_token,
                    amount: Amount::UseUpstreamOutput,
                    pool: "compound".to_string(),
                },
            )
            .depends_on(swap.id)
            .describe("stake the swapped tokens")
        } else {
            let amount = amount.clone().unwrap_or_else(|| "100".to_string());
            Task::new(
                id,
                TaskKind::Stake {
                    token: "MTK".to_string(),
                    amount: Amount::exact(amount.clone()),
                    pool: "compound".to_string(),
                },
            )
            .describe(format!("stake {amount} MTK"))
        };
        tasks.push(task);
    }

    if wants_unstake {
        let id = format!("task_{next_id}");
        next_id += 1;
        let amount = amount.clone().unwrap_or_else(|| "100".to_string());
        tasks.push(
            Task::new(
                id,
                TaskKind::Unstake {
                    token: "MTK".to_string(),
                    amount: Amount::exact(amount.clone()),
                },
            )
            .describe(format!("unstake {amount} MTK")),
        );
    }

    if wants_claim {
        let id = format!("task_{next_id}");
        tasks.push(
            Task::new(
                id,
                TaskKind::Claim {
                    token: "MTK".to_string(),
                },
            )
            .describe("claim staking rewards"),
        );
    }

    tasks
}

/// True when the text mentions staking, excluding "unstake" occurrences.
fn contains_plain_stake(lower: &str) -> bool {
    lower
        .match_indices("stake")
        .any(|(i, _)| !(i >= 2 && &lower[i - 2..i] == "un"))
}

/// The first decimal number in the text.
fn first_number(lower: &str) -> Option<String> {
    let mut current = String::new();
    for c in lower.chars() {
        if c.is_ascii_digit() || (c == '.' && !current.is_empty()) {
            current.push(c);
        } else if !current.is_empty() {
            break;
        }
    }
    let trimmed = current.trim_end_matches('.');
    if trimmed.chars().any(|c| c.is_ascii_digit()) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

/// Token direction from mention order: the token named first is the source.
fn swap_direction(lower: &str) -> (&'static str, &'static str) {
    match (lower.find("meer"), lower.find("mtk")) {
        (Some(m), Some(t)) if t < m => ("MTK", "MEER"),
        _ => ("MEER", "MTK"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainflow_core::TaskStatus;

    #[test]
    fn test_extract_json_tolerates_prose() {
        let text = r#"Here is the plan:
{"tasks": [{"id": "task_1"}]}
Let me know if that works."#;
        assert_eq!(extract_json(text), Some(r#"{"tasks": [{"id": "task_1"}]}"#));
    }

    #[test]
    fn test_extract_json_handles_braces_in_strings() {
        let text = r#"{"note": "a } inside", "x": {"y": 1}} trailing {"#;
        assert_eq!(
            extract_json(text),
            Some(r#"{"note": "a } inside", "x": {"y": 1}}"#)
        );
    }

    #[test]
    fn test_extract_json_none_without_object() {
        assert_eq!(extract_json("no objects here"), None);
        assert_eq!(extract_json("unbalanced {"), None);
    }

    #[test]
    fn test_fallback_single_swap() {
        let tasks = fallback_parse("exchange 10 MEER for MTK");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "task_1");
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        match &tasks[0].kind {
            TaskKind::Swap {
                from_token,
                to_token,
                amount,
            } => {
                assert_eq!(from_token, "MEER");
                assert_eq!(to_token, "MTK");
                assert_eq!(*amount, Amount::exact("10"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_fallback_swap_then_stake_chains_dependency() {
        let tasks = fallback_parse("swap 10 MEER to MTK then stake it");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].depends_on.as_deref(), Some("task_1"));
        match &tasks[1].kind {
            TaskKind::Stake { amount, .. } => assert_eq!(*amount, Amount::UseUpstreamOutput),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_fallback_reversed_pair() {
        let tasks = fallback_parse("swap 500 MTK for MEER");
        match &tasks[0].kind {
            TaskKind::Swap {
                from_token,
                to_token,
                ..
            } => {
                assert_eq!(from_token, "MTK");
                assert_eq!(to_token, "MEER");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_fallback_unstake_is_not_stake() {
        let tasks = fallback_parse("unstake 50 MTK");
        assert_eq!(tasks.len(), 1);
        assert!(matches!(tasks[0].kind, TaskKind::Unstake { .. }));
    }

    #[test]
    fn test_fallback_claim() {
        let tasks = fallback_parse("claim my staking rewards");
        assert_eq!(tasks.len(), 1);
        assert!(matches!(tasks[0].kind, TaskKind::Claim { .. }));
    }

    #[test]
    fn test_fallback_ignores_unrelated_text() {
        assert!(fallback_parse("what is the weather like").is_empty());
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("swap 10 meer"), Some("10".to_string()));
        assert_eq!(first_number("swap 2.5 meer"), Some("2.5".to_string()));
        assert_eq!(first_number("no numbers"), None);
    }
}
