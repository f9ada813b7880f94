//! Axum HTTP server and routing.
//!
//! # Responsibilities
//! - Expose the intercepted store as `POST /query`.
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.

pub mod handlers;
pub mod router;
pub mod state;
