//! HTTP routes of the client service.

mod error;

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, Problem, status_for};

use crate::state::{AppState, build_secure_client};

pub const HELLO: &str = "Hello from Client\n";

/// Upstream resource every call targets
pub const UPSTREAM_PATH: &str = "/server";

#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/client", get(hello))
        .route("/client/client", get(call_with_client))
        .route("/client/clientBuilder", get(call_with_client_builder))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn hello() -> &'static str {
    HELLO
}

/// Calls upstream through the client built at startup.
async fn call_with_client(State(state): State<AppState>) -> Result<String, ApiError> {
    let client = state
        .client
        .as_ref()
        .as_ref()
        .map_err(|failure| ApiError::ClientUnavailable(failure.clone()))?;
    Ok(client.call_path(UPSTREAM_PATH).await?)
}

/// Reloads both stores and builds a fresh client for this request only.
async fn call_with_client_builder(State(state): State<AppState>) -> Result<String, ApiError> {
    tracing::debug!(url = %state.settings.url, "building per-request client");
    let client = build_secure_client(&state.settings, state.resources.as_ref())?;
    Ok(client.call_path(UPSTREAM_PATH).await?)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use mtls_http::InMemoryResources;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ClientSettings;
    use crate::state::StartupFailure;

    const KEYSTORE: &[u8] = include_bytes!("../../resources/client-keystore.p12");
    const TRUSTSTORE: &[u8] = include_bytes!("../../resources/client-truststore.p12");

    fn settings() -> ClientSettings {
        ClientSettings {
            // nothing listens on port 1
            url: "https://127.0.0.1:1".to_owned(),
            key_store_password: "secret".into(),
            trust_store_password: "changeit".into(),
            request_timeout: Duration::from_secs(5),
            ..ClientSettings::default()
        }
    }

    fn resources() -> InMemoryResources {
        InMemoryResources::new()
            .with("client-keystore.p12", KEYSTORE)
            .with("client-truststore.p12", TRUSTSTORE)
    }

    fn app(settings: ClientSettings, resources: InMemoryResources) -> Router {
        router(AppState::initialize(settings, Arc::new(resources)))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, bytes::Bytes) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_owned());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, body)
    }

    fn problem(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_hello_is_plain_text() {
        let (status, content_type, body) = get(app(settings(), resources()), "/client").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/plain"));
        assert_eq!(body, HELLO);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (status, _, _) = get(app(settings(), resources()), "/client/other").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_keystore_is_internal_error() {
        let resources = InMemoryResources::new().with("client-truststore.p12", TRUSTSTORE);
        let (status, content_type, body) =
            get(app(settings(), resources), "/client/clientBuilder").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let problem = problem(&body);
        assert_eq!(problem["kind"], "StoreDecode");
        assert_eq!(problem["status"], 500);
        assert!(problem["detail"].as_str().unwrap().contains("client-keystore.p12"));
    }

    #[tokio::test]
    async fn test_wrong_passphrase_is_internal_error() {
        let settings = ClientSettings {
            key_store_password: "wrong".into(),
            ..settings()
        };
        let (status, _, body) = get(app(settings, resources()), "/client/clientBuilder").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(problem(&body)["kind"], "BadPassphrase");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let (status, _, body) = get(app(settings(), resources()), "/client/clientBuilder").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(problem(&body)["kind"], "Connection");
    }

    #[tokio::test]
    async fn test_startup_failure_is_service_unavailable() {
        let state = AppState::initialize(settings(), Arc::new(InMemoryResources::new()));
        assert!(matches!(
            state.client.as_ref(),
            Err(StartupFailure {
                kind: mtls_http::ErrorKind::StoreDecode,
                ..
            })
        ));

        let (status, _, body) = get(router(state), "/client/client").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(problem(&body)["kind"], "StoreDecode");
    }

    #[tokio::test]
    async fn test_startup_client_is_used_for_client_route() {
        let state = AppState::initialize(settings(), Arc::new(resources()));
        assert!(state.client.is_ok());

        let (status, _, body) = get(router(state), "/client/client").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(problem(&body)["kind"], "Connection");
    }
}
