use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::{ChatMessage, ChatModel, ChatRequest, Completion, ModelError, Usage};
use crate::client::{HttpClient, read_response};
use crate::config::Secret;

/// Client for an OpenAI-compatible chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiChat<C: HttpClient> {
    http_client: C,
    completions_url: Url,
    api_key: Secret,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<&'a ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<WireUsage> for Usage {
    fn from(u: WireUsage) -> Self {
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

impl<C: HttpClient> OpenAiChat<C> {
    pub fn new(http_client: C, base_url: &Url, api_key: Secret) -> Result<Self, ModelError> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let completions_url = base
            .join("chat/completions")
            .map_err(|e| ModelError::Transport(format!("invalid model API URL: {e}")))?;
        Ok(Self {
            http_client,
            completions_url,
            api_key,
        })
    }
}

/// OpenAI reports failures as `{ "error": { "message": ... } }`.
fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Model request failed")
                    .to_string()
            } else {
                text
            }
        })
}

#[async_trait]
impl<C: HttpClient> ChatModel for OpenAiChat<C> {
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ModelError> {
        let system = request
            .system_prompt
            .as_ref()
            .map(|prompt| ChatMessage::new("system", prompt.as_str()));
        let wire = WireRequest {
            model: &request.model,
            messages: system.iter().chain(request.messages.iter()).collect(),
            temperature: request.temperature,
        };
        let body = serde_json::to_vec(&wire).map_err(|e| ModelError::Decode(e.to_string()))?;

        let req = Request::builder()
            .method(Method::POST)
            .uri(self.completions_url.as_str())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key.expose()))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let response = self
            .http_client
            .request(req)
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;
        let (status, bytes) = read_response(response)
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ModelError::Rejected {
                status: status.as_u16(),
                message: rejection_message(status, &bytes),
            });
        }

        let parsed: WireResponse =
            serde_json::from_slice(&bytes).map_err(|e| ModelError::Decode(e.to_string()))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::Decode("response contained no message content".into()))?;
        debug!("Received completion of {} bytes", text.len());

        Ok(Completion {
            text,
            usage: parsed.usage.map(Usage::from).unwrap_or_default(),
        })
    }
}
