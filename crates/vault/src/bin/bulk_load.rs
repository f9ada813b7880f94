//! `bulk-load` — encrypt seed data for import.
//!
//! Reads a seed file of plaintext rows and writes newline-delimited JSON
//! `{"model", "data"}` rows with every configured field encrypted exactly as
//! the running service would encrypt it.
//!
//! The key comes from `ENCRYPTION_KEY` and is always required, regardless of
//! `APP_ENV`: an ephemeral key would make the output unreadable.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use vault::bulk;
use vault::config::{AppEnv, Config};
use vault::crypto::{FieldCipher, FieldKey};
use vault::interceptor::{EncryptedStore, Interceptor};
use vault::schema;
use vault::store::NdjsonSink;
use vault::telemetry;

#[derive(Debug, Parser)]
#[command(name = "bulk-load", version, about = "Encrypt clinic seed data for bulk import")]
struct Args {
    /// Seed file: JSON array of {"model", "rows"}.
    #[arg(short, long)]
    input: PathBuf,

    /// Output NDJSON file.
    #[arg(short, long)]
    output: PathBuf,

    /// Fields file; defaults to FIELDS_PATH, then the built-in clinic map.
    #[arg(long)]
    fields: Option<PathBuf>,

    /// Rows per createMany call.
    #[arg(long, default_value_t = 500)]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::from_env()?;
    telemetry::init_cli(&cfg.log_level)?;

    let key = FieldKey::resolve(cfg.encryption_key(), AppEnv::Production)
        .context("bulk-load requires a valid ENCRYPTION_KEY")?;
    let fields_path = args.fields.as_deref().or(cfg.fields_path.as_deref());
    let registry = Arc::new(schema::load(fields_path)?);
    let interceptor = Interceptor::new(Arc::new(FieldCipher::new(key)?), registry);

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read seed file {}", args.input.display()))?;
    let tables = bulk::parse_seed(&text)?;

    let file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let store = EncryptedStore::new(NdjsonSink::new(BufWriter::new(file)), interceptor);

    let summary = bulk::load(&store, tables, args.batch_size).await?;
    store
        .into_inner()
        .into_inner()
        .context("failed to flush output")?;

    info!(
        rows = summary.total(),
        tables = summary.tables.len(),
        output = %args.output.display(),
        "bulk load complete"
    );
    Ok(())
}
