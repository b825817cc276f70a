//! PostgREST client authenticated with a service-role key.
//!
//! Rows are addressed as `<base>/rest/v1/<table>`; filters, ordering and limits travel in the
//! query string the way PostgREST expects them (`id=eq.abc`, `order=created_at.desc`).
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use url::Url;

use super::{DataStore, Row, RowFilter, SelectQuery, StoreError};
use crate::client::{HttpClient, read_response};
use crate::config::Secret;

const REST_PATH: &str = "rest/v1/";

#[derive(Debug, Clone)]
pub struct RestStore<C: HttpClient> {
    http_client: C,
    rest_url: Url,
    service_role_key: Secret,
}

impl<C: HttpClient> RestStore<C> {
    pub fn new(http_client: C, project_url: &Url, service_role_key: Secret) -> Result<Self, StoreError> {
        // Url::join drops the last path segment unless it ends with a slash.
        let mut base = project_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let rest_url = base
            .join(REST_PATH)
            .map_err(|e| StoreError::Transport(format!("invalid data store URL: {e}")))?;
        Ok(Self {
            http_client,
            rest_url,
            service_role_key,
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        self.rest_url
            .join(table)
            .map_err(|e| StoreError::Transport(format!("invalid table name {table}: {e}")))
    }

    fn request(&self, method: Method, url: &Url) -> axum::http::request::Builder {
        let key = self.service_role_key.expose();
        Request::builder()
            .method(method)
            .uri(url.as_str())
            .header("apikey", key)
            .header(header::AUTHORIZATION, format!("Bearer {key}"))
            .header(header::ACCEPT, "application/json")
    }

    async fn send(&self, req: Request<Body>) -> Result<Vec<Row>, StoreError> {
        let response = self
            .http_client
            .request(req)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let (status, bytes) = read_response(response)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message: rejection_message(status, &bytes),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

/// PostgREST reports failures as `{ "message": ..., "code": ... }`.
fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Data store request failed")
            .to_string()
    } else {
        text
    }
}

#[async_trait]
impl<C: HttpClient> DataStore for RestStore<C> {
    #[instrument(skip(self))]
    async fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Row>, StoreError> {
        let mut url = self.table_url(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", query.projection());
            if let Some(order) = &query.order {
                let direction = if order.descending { "desc" } else { "asc" };
                pairs.append_pair("order", &format!("{}.{}", order.column, direction));
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        debug!("Selecting from {}", url.path());

        let req = self
            .request(Method::GET, &url)
            .body(Body::empty())
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        self.send(req).await
    }

    #[instrument(skip(self, patch))]
    async fn update(
        &self,
        table: &str,
        filter: &RowFilter,
        patch: &Map<String, Value>,
    ) -> Result<Vec<Row>, StoreError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair(&filter.column, &format!("eq.{}", filter.value));
        debug!("Updating {} where {} matches", url.path(), filter.column);

        let body = serde_json::to_vec(patch).map_err(|e| StoreError::Decode(e.to_string()))?;
        let req = self
            .request(Method::PATCH, &url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("prefer", "return=representation")
            .body(Body::from(body))
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        self.send(req).await
    }
}
