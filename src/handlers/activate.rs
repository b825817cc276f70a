use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

use super::parse_body;
use crate::AppState;
use crate::errors::HandlerError;
use crate::llm::ChatModel;
use crate::store::{DataStore, RowFilter};

pub const USER_ID_REQUIRED: &str = "User ID required";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivateUser {
    user_id: Option<String>,
}

/// Marks one user row active and stamps the activation time.
#[instrument(skip(state, body))]
pub async fn activate_user<S, M>(
    State(state): State<AppState<S, M>>,
    body: Bytes,
) -> Result<Json<Value>, HandlerError>
where
    S: DataStore + Clone + 'static,
    M: ChatModel + Clone + 'static,
{
    let payload: ActivateUser = parse_body(&body)?;
    let user_id = payload
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| HandlerError::Validation(USER_ID_REQUIRED.into()))?;

    let store = state.store()?;

    let mut patch = Map::new();
    patch.insert("status".into(), json!("active"));
    patch.insert(
        "activated_at".into(),
        json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    let rows = store
        .update(&state.tables.users, &RowFilter::eq("id", &user_id), &patch)
        .await?;
    info!(user_id = %user_id, updated = rows.len(), "Activated user");

    Ok(Json(json!({
        "message": "User activated successfully",
        "data": rows,
    })))
}
