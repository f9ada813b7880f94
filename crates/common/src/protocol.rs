//! Request and response types of the vault's HTTP API.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Query endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /query`.
///
/// Mirrors one relational-mapper call: the entity (`model`), the operation
/// name (`create`, `findMany`, ...), and its argument object. Sensitive fields
/// in `args` are given in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Target entity type, e.g. `"users"`.
    pub model: String,
    /// Operation name, e.g. `"findMany"`.
    pub operation: String,
    /// Mapper-shaped arguments (`data`, `where`, ...).
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Successful response body for `POST /query`.
///
/// Same shape the store returned, with sensitive fields in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Operation result.
    pub result: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"`.
    pub status: String,
    /// Number of entity types with encrypted fields.
    pub sensitive_entities: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_request_args_default_to_null() {
        let req: QueryRequest =
            serde_json::from_value(json!({"model": "users", "operation": "findMany"})).unwrap();
        assert_eq!(req.model, "users");
        assert!(req.args.is_null());
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("not_found", "no users record matched the query");
        assert_eq!(e.code, "not_found");
        assert!(e.message.contains("users"));
    }
}
