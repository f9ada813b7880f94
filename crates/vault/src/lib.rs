//! Clinic field vault.
//!
//! Transparent field-level encryption in front of the clinic's relational
//! store: configured fields are encrypted deterministically on the way in
//! (payloads and equality filters) and decrypted on the way out, across
//! related entities at any depth.

pub mod bulk;
pub mod config;
pub mod crypto;
pub mod interceptor;
pub mod schema;
pub mod server;
pub mod store;
pub mod telemetry;
