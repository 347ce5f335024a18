//! # Chainflow LLM
//!
//! The pluggable language-model chat interface the decomposer calls.
//!
//! The engine treats this as a black box: an ordered list of role/content
//! messages in, free text out. [`OpenAiClient`] talks to any
//! OpenAI-compatible chat-completions endpoint; [`ScriptedClient`] returns
//! canned responses for tests and local demos.

pub mod openai;
pub mod scripted;

pub use openai::OpenAiClient;
pub use scripted::ScriptedClient;

use async_trait::async_trait;
use chainflow_core::Result;
use serde::{Deserialize, Serialize};

/// One chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// A `system` role message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// A `user` role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A chat-capable language-model client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send an ordered message list, get the model's free-text reply.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;
}
