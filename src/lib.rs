//! edge-relay - edge function handlers for a hosted data store and a chat model API
//!
//! Each endpoint terminates one request by making at most one outbound call: activating a user
//! row, probing the store, listing rows, or forwarding a chat completion. Responses are JSON with
//! a fixed set of cross-origin headers, and every failure becomes `{ "error": message }`.

use axum::Router;
use axum::routing::{get, post};
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use bon::Builder;
use std::borrow::Cow;
use tracing::{info, instrument};

pub mod client;
pub mod config;
pub mod cors;
pub mod errors;
pub mod handlers;
pub mod llm;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

use client::HyperClient;
use config::{ChatDefaults, Config, Tables};
use errors::{HandlerError, MISSING_MODEL_CONFIG, MISSING_STORE_CONFIG};
use llm::{ChatModel, OpenAiChat};
use store::{DataStore, RestStore};

/// Everything a handler may use: the two remote clients (absent when not configured) and the
/// settings that shape their calls. Read-only once built.
#[derive(Clone, Debug, Builder)]
pub struct AppState<S, M> {
    pub store: Option<S>,
    pub model: Option<M>,
    #[builder(default)]
    pub tables: Tables,
    #[builder(default)]
    pub chat_defaults: ChatDefaults,
}

/// The state used in production: both clients go over hyper.
pub type LiveState = AppState<RestStore<HyperClient>, OpenAiChat<HyperClient>>;

impl LiveState {
    /// Builds the production clients from configuration. A missing credential leaves the
    /// corresponding client unset, so its endpoints answer 500 instead of using a default.
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let http_client = client::create_hyper_client(config.pool_settings());

        let store = config
            .store
            .credentials()?
            .map(|(url, key)| RestStore::new(http_client.clone(), &url, key))
            .transpose()?;
        let model = config
            .model
            .api_key()
            .map(|key| OpenAiChat::new(http_client, &config.model.openai_base_url, key))
            .transpose()?;

        Ok(AppState::builder()
            .maybe_store(store)
            .maybe_model(model)
            .tables(config.tables.clone())
            .chat_defaults(config.chat.clone())
            .build())
    }
}

impl<S: DataStore, M: ChatModel> AppState<S, M> {
    pub(crate) fn store(&self) -> Result<&S, HandlerError> {
        self.store
            .as_ref()
            .ok_or_else(|| HandlerError::Configuration(MISSING_STORE_CONFIG.into()))
    }

    pub(crate) fn model(&self) -> Result<&M, HandlerError> {
        self.model
            .as_ref()
            .ok_or_else(|| HandlerError::Configuration(MISSING_MODEL_CONFIG.into()))
    }
}

/// Build the router serving the four endpoints:
/// - `POST /activate-user`
/// - `GET /health-check`
/// - `GET /list-rows`
/// - `POST /chat`
///
/// Each also answers OPTIONS preflights. Unknown paths get a JSON 404 with the same
/// cross-origin headers.
#[instrument(skip(state))]
pub fn build_router<S, M>(state: AppState<S, M>) -> Router
where
    S: DataStore + Clone + 'static,
    M: ChatModel + Clone + 'static,
{
    info!("Building router");
    Router::new()
        .route(
            "/activate-user",
            cors::endpoint("POST, OPTIONS", post(handlers::activate_user::<S, M>)),
        )
        .route(
            "/health-check",
            cors::endpoint("GET, OPTIONS", get(handlers::health_check::<S, M>)),
        )
        .route(
            "/list-rows",
            cors::endpoint("GET, OPTIONS", get(handlers::list_rows::<S, M>)),
        )
        .route(
            "/chat",
            cors::endpoint("POST, OPTIONS", post(handlers::chat::<S, M>)),
        )
        .fallback(cors::fallback)
        .with_state(state)
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
///
/// The prefix must live for the whole program, since the prometheus recorder is global.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .enable_response_body_size(true)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}
