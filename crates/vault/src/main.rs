//! `vault` — HTTP service entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise logging (and OTLP export when configured).
//! 3. Resolve the field key; production refuses to start without one.
//! 4. Load the sensitivity / relation configuration into an [`EntityRegistry`].
//! 5. Wrap the store in the encrypting interceptor.
//! 6. Build the Axum router and serve until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use vault::config::Config;
use vault::crypto::{FieldCipher, FieldKey};
use vault::interceptor::{EncryptedStore, Interceptor};
use vault::schema::{self, EntityRegistry};
use vault::server::{self, state::AppState};
use vault::store::MemoryStore;
use vault::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        app_env = ?cfg.app_env,
        "clinic vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Field key
    // -----------------------------------------------------------------------
    let key = FieldKey::resolve(cfg.encryption_key(), cfg.app_env)
        .context("refusing to start without a valid ENCRYPTION_KEY")?;
    let cipher = Arc::new(FieldCipher::new(key)?);

    // -----------------------------------------------------------------------
    // 4. Entity registry
    // -----------------------------------------------------------------------
    let registry: Arc<EntityRegistry> = Arc::new(schema::load(cfg.fields_path.as_deref())?);

    // -----------------------------------------------------------------------
    // 5. Intercepted store
    // -----------------------------------------------------------------------
    let sensitive_entities = registry.sensitive_len();
    let store = EncryptedStore::new(MemoryStore::new(), Interceptor::new(cipher, registry));

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(Arc::new(store), sensitive_entities);
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("clinic vault stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C; shutting down");
    }
}
