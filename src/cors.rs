//! Cross-origin headers and preflight handling
//!
//! Every response an endpoint produces, success or failure, carries the same header set. OPTIONS
//! requests are answered here without touching the endpoint's handler.
use axum::body::Body;
use axum::http::{HeaderValue, Method, Uri, header};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;

use crate::errors::HandlerError;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Advertised on paths that match no endpoint.
pub const FALLBACK_METHODS: &str = "GET, POST, OPTIONS";

/// Answers a preflight request: 200, body `ok`.
pub async fn preflight() -> Response {
    Response::new(Body::from("ok"))
}

async fn method_not_allowed(method: Method) -> HandlerError {
    HandlerError::MethodNotAllowed(method.to_string())
}

fn apply_headers(response: &mut Response, allow_methods: &'static str) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(allow_methods),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}

/// Router fallback for unknown paths: preflights still get `ok`, anything else a JSON 404.
/// Both carry the cross-origin headers.
pub async fn fallback(method: Method, uri: Uri) -> Response {
    let mut response = if method == Method::OPTIONS {
        preflight().await
    } else {
        HandlerError::NotFound(uri.path().to_string()).into_response()
    };
    apply_headers(&mut response, FALLBACK_METHODS);
    response
}

/// Wraps an endpoint's primary method router with preflight handling, a JSON 405 for any
/// other method, and the cross-origin headers. `allow_methods` is advertised verbatim,
/// e.g. `"POST, OPTIONS"`.
pub fn endpoint<S>(allow_methods: &'static str, primary: MethodRouter<S>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    primary
        .options(preflight)
        .fallback(method_not_allowed)
        .layer(map_response(move |mut response: Response| async move {
            apply_headers(&mut response, allow_methods);
            response
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::get;
    use axum_test::TestServer;

    fn server() -> TestServer {
        let router = Router::new().route("/thing", endpoint("GET, OPTIONS", get(|| async { "hi" })));
        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let response = server()
            .method(axum::http::Method::OPTIONS, "/thing")
            .await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), "ok");
        assert_eq!(response.header("access-control-allow-origin"), "*");
        assert_eq!(
            response.header("access-control-allow-methods"),
            "GET, OPTIONS"
        );
        assert_eq!(response.header("access-control-allow-headers"), ALLOW_HEADERS);
    }

    #[tokio::test]
    async fn test_fallback_carries_headers() {
        let router = Router::new()
            .route("/thing", endpoint("GET, OPTIONS", get(|| async { "hi" })))
            .fallback(fallback);
        let server = TestServer::new(router).unwrap();

        let response = server.post("/elsewhere").await;
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.header("access-control-allow-origin"), "*");
        assert_eq!(
            response.header("access-control-allow-methods"),
            FALLBACK_METHODS
        );

        let response = server
            .method(axum::http::Method::OPTIONS, "/elsewhere")
            .await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), "ok");
        assert_eq!(response.header("access-control-allow-headers"), ALLOW_HEADERS);
    }

    #[tokio::test]
    async fn test_other_methods_get_json_405_with_headers() {
        let response = server().delete("/thing").await;

        assert_eq!(response.status_code(), 405);
        assert_eq!(response.header("access-control-allow-origin"), "*");
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Method DELETE not allowed");
    }
}
