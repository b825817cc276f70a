//! Axum handlers, one per endpoint.
//!
//! Each handler runs the same shape: parse the body, check required fields, check that the
//! backend it needs is configured, make exactly one outbound call, and map the outcome. Any
//! failure leaves through [`HandlerError`].
use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::errors::HandlerError;

mod activate;
mod chat;
mod health;
mod listing;

pub use activate::{USER_ID_REQUIRED, activate_user};
pub use chat::{ChatReply, MESSAGES_REQUIRED, chat};
pub use health::health_check;
pub use listing::list_rows;

/// Decodes a JSON body, treating an empty one as `{}`.
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, HandlerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| HandlerError::Validation(format!("Invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    struct Payload {
        name: Option<String>,
    }

    #[test]
    fn test_empty_body_is_default() {
        let parsed: Payload = parse_body(&Bytes::from_static(b"  \n")).unwrap();
        assert!(parsed.name.is_none());
    }

    #[test]
    fn test_malformed_body_is_validation_error() {
        let err = parse_body::<Payload>(&Bytes::from_static(b"{not json")).unwrap_err();
        assert!(matches!(err, HandlerError::Validation(ref m) if m.starts_with("Invalid JSON body")));
    }

    #[test]
    fn test_wrong_field_type_is_validation_error() {
        let err = parse_body::<Payload>(&Bytes::from_static(br#"{"name": 42}"#)).unwrap_err();
        assert!(matches!(err, HandlerError::Validation(_)));
    }
}
