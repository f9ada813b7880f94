//! Logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No plaintext, ciphertext, or key material** in any span attribute or
//!   log field. Field-level failures log the error kind only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), overridden
//!   by `RUST_LOG` when set.

pub mod init;

pub use init::{init_cli, init_telemetry};
