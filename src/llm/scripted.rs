use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::{ChatModel, ChatRequest, Completion, ModelError, Usage};

/// A model that answers every prompt the same way and remembers what it was asked.
#[derive(Debug, Clone)]
pub struct ScriptedModel {
    reply: Result<Completion, String>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedModel {
    pub fn replying(text: impl Into<String>, usage: Usage) -> Self {
        Self {
            reply: Ok(Completion {
                text: text.into(),
                usage,
            }),
            requests: Arc::default(),
        }
    }

    /// Every call fails with `message`, the way a provider rejects a bad key.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ModelError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.reply.clone().map_err(|message| ModelError::Rejected {
            status: 401,
            message,
        })
    }
}
