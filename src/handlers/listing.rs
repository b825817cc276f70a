use axum::Json;
use axum::extract::State;
use tracing::{debug, instrument};

use crate::AppState;
use crate::errors::HandlerError;
use crate::llm::ChatModel;
use crate::store::{DataStore, OrderBy, Row, SelectQuery};

/// Returns every row of the listing table, newest first, exactly as the store sent them.
#[instrument(skip(state))]
pub async fn list_rows<S, M>(
    State(state): State<AppState<S, M>>,
) -> Result<Json<Vec<Row>>, HandlerError>
where
    S: DataStore + Clone + 'static,
    M: ChatModel + Clone + 'static,
{
    let store = state.store()?;

    let query = SelectQuery::builder()
        .order(OrderBy::desc("created_at"))
        .build();
    let rows = store.select(&state.tables.listing, &query).await?;
    debug!(table = %state.tables.listing, rows = rows.len(), "Listed rows");

    Ok(Json(rows))
}
