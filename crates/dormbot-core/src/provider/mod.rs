//! LLM provider trait.
//!
//! General questions that no keyword rule handles are forwarded to a chat
//! model. The `openai` module provides an OpenAI-compatible implementation
//! that covers Groq and most hosted models.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single message in a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Trait for LLM providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one chat completion request and return the reply text.
    async fn chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;

    /// Get the default model identifier.
    fn default_model(&self) -> &str;
}
