//! Axum router construction.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

/// Requests still running after this long are answered with 408.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/query", post(handlers::query))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(QUERY_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::crypto::{FieldCipher, FieldKey, KEY_LEN};
    use crate::interceptor::{EncryptedStore, Interceptor};
    use crate::schema::{EntityRegistry, FieldsConfig};
    use crate::store::MemoryStore;

    fn test_app() -> Router {
        let registry = Arc::new(EntityRegistry::new(&FieldsConfig::clinic_defaults()));
        let cipher = Arc::new(FieldCipher::new(FieldKey::from_bytes([0x42; KEY_LEN])).unwrap());
        let sensitive = registry.sensitive_len();
        let store = EncryptedStore::new(MemoryStore::new(), Interceptor::new(cipher, registry));
        build(AppState::new(Arc::new(store), sensitive))
    }

    async fn post_query(app: &Router, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = test_app();
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn health_reports_sensitive_entities() {
        let app = test_app();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["sensitive_entities"], 6);
    }

    #[tokio::test]
    async fn create_then_search_by_plaintext() {
        let app = test_app();
        let (status, created) = post_query(
            &app,
            json!({
                "model": "users",
                "operation": "create",
                "args": {"data": {"id": 1, "username": "carlos", "phone_number": "5551234567"}}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["result"]["phone_number"], "5551234567");

        let (status, found) = post_query(
            &app,
            json!({
                "model": "users",
                "operation": "findFirst",
                "args": {"where": {"phone_number": "5551234567"}}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["result"]["username"], "carlos");
    }

    #[tokio::test]
    async fn update_missing_row_is_404() {
        let app = test_app();
        let (status, body) = post_query(
            &app,
            json!({
                "model": "notes",
                "operation": "update",
                "args": {"where": {"id": 99}, "data": {"content": "x"}}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn malformed_args_are_400() {
        let app = test_app();
        let (status, body) = post_query(
            &app,
            json!({"model": "notes", "operation": "create", "args": {"data": "nope"}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
    }
}
