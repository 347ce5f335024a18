//! Scripted client for tests and local demos.

use std::collections::VecDeque;

use async_trait::async_trait;
use chainflow_core::{ChainflowError, Result};
use tokio::sync::Mutex;

use crate::{ChatMessage, LlmClient};

/// Returns pre-recorded responses in order; errors when the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedClient {
    /// Create a client that will reply with `responses`, one per call.
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        if messages.is_empty() {
            return Err(ChainflowError::Llm("no messages provided".to_string()));
        }
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| ChainflowError::Llm("scripted client exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let client = ScriptedClient::new(["first", "second"]);
        let msg = [ChatMessage::user("hi")];
        assert_eq!(client.chat(&msg).await.unwrap(), "first");
        assert_eq!(client.chat(&msg).await.unwrap(), "second");
        assert!(client.chat(&msg).await.is_err());
    }
}
