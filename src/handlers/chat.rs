use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::parse_body;
use crate::AppState;
use crate::errors::HandlerError;
use crate::llm::{ChatMessage, ChatModel, ChatRequest, Usage};
use crate::store::DataStore;

pub const MESSAGES_REQUIRED: &str = "Messages array required";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatPayload {
    messages: Option<Vec<ChatMessage>>,
    model: Option<String>,
    system_prompt: Option<String>,
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub text: String,
    pub usage: Usage,
}

/// Forwards a conversation to the chat model and returns its reply.
#[instrument(skip(state, body))]
pub async fn chat<S, M>(
    State(state): State<AppState<S, M>>,
    body: Bytes,
) -> Result<Json<ChatReply>, HandlerError>
where
    S: DataStore + Clone + 'static,
    M: ChatModel + Clone + 'static,
{
    let payload: ChatPayload = parse_body(&body)?;
    let messages = payload
        .messages
        .filter(|messages| !messages.is_empty())
        .ok_or_else(|| HandlerError::Validation(MESSAGES_REQUIRED.into()))?;

    let model = state.model()?;

    let defaults = &state.chat_defaults;
    let request = ChatRequest::builder()
        .model(payload.model.unwrap_or_else(|| defaults.model.clone()))
        .system_prompt(
            payload
                .system_prompt
                .unwrap_or_else(|| defaults.system_prompt.clone()),
        )
        .messages(messages)
        .temperature(payload.temperature.unwrap_or(defaults.temperature))
        .build();

    let completion = model.complete(&request).await?;
    info!(
        model = %request.model,
        total_tokens = completion.usage.total_tokens,
        "Chat completion finished"
    );

    Ok(Json(ChatReply {
        text: completion.text,
        usage: completion.usage,
    }))
}
