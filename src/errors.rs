use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use crate::llm::ModelError;
use crate::store::StoreError;

/// Returned when the data store URL or service-role key is absent.
pub const MISSING_STORE_CONFIG: &str = "Missing Server Configuration (URL or Service Role Key).";

/// Returned when no chat model API key is configured.
pub const MISSING_MODEL_CONFIG: &str = "Missing OpenAI API key.";

/// Every way a handler can fail. Each variant becomes `{ "error": message }` on the wire.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// A required request field is missing or the body is malformed.
    #[error("{0}")]
    Validation(String),
    /// Credentials or endpoints for the outbound call are not configured.
    #[error("{0}")]
    Configuration(String),
    /// The outbound call itself failed.
    #[error("{0}")]
    Dependency(String),
    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::Validation(_) => StatusCode::BAD_REQUEST,
            HandlerError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            HandlerError::NotFound(_) => StatusCode::NOT_FOUND,
            HandlerError::Configuration(_) | HandlerError::Dependency(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for HandlerError {
    fn from(e: StoreError) -> Self {
        HandlerError::Dependency(e.to_string())
    }
}

impl From<ModelError> for HandlerError {
    fn from(e: ModelError) -> Self {
        HandlerError::Dependency(e.to_string())
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", message);
        } else {
            warn!(status = status.as_u16(), "Request rejected: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HandlerError::Validation("User ID required".into()), 400)]
    #[case(HandlerError::Configuration(MISSING_STORE_CONFIG.into()), 500)]
    #[case(HandlerError::Dependency("connection refused".into()), 500)]
    #[case(HandlerError::MethodNotAllowed("PUT".into()), 405)]
    #[case(HandlerError::NotFound("/nope".into()), 404)]
    fn test_status_mapping(#[case] error: HandlerError, #[case] expected: u16) {
        assert_eq!(error.status().as_u16(), expected);
    }

    #[tokio::test]
    async fn test_error_body_carries_raw_message() {
        let response = HandlerError::Dependency("Incorrect API key provided".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Incorrect API key provided" }));
    }

    #[test]
    fn test_store_errors_become_dependency_failures() {
        let error: HandlerError = StoreError::Rejected {
            status: 503,
            message: "upstream unavailable".into(),
        }
        .into();
        assert!(matches!(error, HandlerError::Dependency(ref m) if m == "upstream unavailable"));
    }
}
