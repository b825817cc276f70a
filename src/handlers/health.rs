use axum::Json;
use axum::extract::State;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::AppState;
use crate::errors::HandlerError;
use crate::llm::ChatModel;
use crate::store::{DataStore, SelectQuery};

/// Proves the data store is reachable with the configured credentials by reading at most one
/// row id from the probe table.
#[instrument(skip(state))]
pub async fn health_check<S, M>(
    State(state): State<AppState<S, M>>,
) -> Result<Json<Value>, HandlerError>
where
    S: DataStore + Clone + 'static,
    M: ChatModel + Clone + 'static,
{
    let store = state.store()?;

    let probe = SelectQuery::builder().columns("id").limit(1).build();
    let rows = store.select(&state.tables.health, &probe).await?;
    debug!(table = %state.tables.health, rows = rows.len(), "Health probe succeeded");

    Ok(Json(json!({
        "message": "Database connection successful",
        "details": {
            "table": state.tables.health,
            "rowsSampled": rows.len(),
            "checkedAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        },
    })))
}
