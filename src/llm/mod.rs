//! Chat completion clients
//!
//! [`ChatModel`] is the one capability the chat handler needs: turn a prompt into text.
//! [`OpenAiChat`] calls an OpenAI-compatible `/chat/completions` endpoint; [`ScriptedModel`]
//! answers from a script for tests.
use async_trait::async_trait;
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod openai;
mod scripted;

pub use openai::OpenAiChat;
pub use scripted::ScriptedModel;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The provider answered with an error status.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Model request failed: {0}")]
    Transport(String),
    #[error("Failed to decode model response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    /// Forwarded untouched: plain text, or an array of content parts.
    pub content: Value,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Builder)]
pub struct ChatRequest {
    #[builder(into)]
    pub model: String,
    #[builder(into)]
    pub system_prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

#[async_trait]
pub trait ChatModel: std::fmt::Debug + Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ModelError>;
}
