//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::store::Store;

/// Application state shared across all request handlers.
///
/// Cheap to clone: the store sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The intercepted store. Handlers only ever see plaintext.
    pub store: Arc<dyn Store>,
    /// Number of entity types with encrypted fields, reported by `/health`.
    pub sensitive_entities: usize,
}

impl AppState {
    /// Create a new [`AppState`].
    pub fn new(store: Arc<dyn Store>, sensitive_entities: usize) -> Self {
        Self {
            store,
            sensitive_entities,
        }
    }
}
