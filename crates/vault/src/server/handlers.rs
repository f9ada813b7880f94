//! Axum request handlers for all service endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, HealthResponse, QueryRequest, QueryResponse};
use common::ServiceError;
use tracing::warn;

use super::state::AppState;
use crate::store::{Operation, StorageRequest, StoreError};

/// `POST /query` — run one storage call through the encrypting store.
///
/// Sensitive fields are accepted and returned in plaintext; only the store
/// ever sees ciphertext.
pub async fn query(State(state): State<AppState>, Json(req): Json<QueryRequest>) -> Response {
    let request = StorageRequest::new(req.model, Operation::from(req.operation), req.args);
    match state.store.execute(request).await {
        Ok(result) => (StatusCode::OK, Json(QueryResponse { result })).into_response(),
        Err(e) => error_response(&to_service_error(e)),
    }
}

/// `GET /health` — liveness check.
pub async fn health(State(state): State<AppState>) -> Response {
    let body = HealthResponse {
        status: "ok".into(),
        sensitive_entities: state.sensitive_entities,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn to_service_error(e: StoreError) -> ServiceError {
    match e {
        StoreError::NotFound { .. } => ServiceError::NotFound(e.to_string()),
        StoreError::UniqueViolation { .. } => ServiceError::Conflict(e.to_string()),
        StoreError::InvalidArgs(_) | StoreError::Unsupported { .. } => {
            ServiceError::BadRequest(e.to_string())
        }
        StoreError::Io(io) => {
            warn!(error = %io, "storage I/O failed");
            ServiceError::Internal("storage failure".into())
        }
    }
}

fn error_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match err {
        ServiceError::BadRequest(m)
        | ServiceError::NotFound(m)
        | ServiceError::Conflict(m)
        | ServiceError::Internal(m) => m.clone(),
    };
    (status, Json(ErrorResponse::new(err.code(), message))).into_response()
}
