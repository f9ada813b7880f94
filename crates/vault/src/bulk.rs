//! Bulk loading of seed data through the encrypting store.
//!
//! Seed rows reach the backend only via [`EncryptedStore`], the same
//! decorator the HTTP service uses, so the loader and the runtime cannot
//! disagree about which fields are encrypted or how.
//!
//! Seed file shape:
//!
//! ```json
//! [
//!   { "model": "users", "rows": [ { "id": 1, "phone_number": "5551234567" } ] },
//!   { "model": "notes", "rows": [ ... ] }
//! ]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::interceptor::EncryptedStore;
use crate::store::{Operation, StorageRequest, Store};

/// One table of seed rows.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedTable {
    /// Target entity type.
    pub model: String,
    /// Rows in plaintext.
    pub rows: Vec<Map<String, Value>>,
}

/// Rows written per entity type, in load order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// `(model, rows written)` for each seed table.
    pub tables: Vec<(String, usize)>,
}

impl LoadSummary {
    /// Total rows across all tables.
    pub fn total(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }
}

/// Parse a seed document.
///
/// # Errors
///
/// Returns an error if the text is not a JSON array of `{model, rows}`.
pub fn parse_seed(text: &str) -> Result<Vec<SeedTable>> {
    serde_json::from_str(text).context("seed file must be a JSON array of {model, rows}")
}

/// Load every table with `createMany` calls of at most `batch_size` rows.
///
/// # Errors
///
/// Returns the first store error, annotated with the table and batch.
pub async fn load<S: Store>(
    store: &EncryptedStore<S>,
    tables: Vec<SeedTable>,
    batch_size: usize,
) -> Result<LoadSummary> {
    anyhow::ensure!(batch_size > 0, "batch size must be > 0");

    let mut summary = LoadSummary::default();
    for table in tables {
        let mut written = 0usize;
        for (batch_no, chunk) in table.rows.chunks(batch_size).enumerate() {
            let rows: Vec<Value> = chunk.iter().cloned().map(Value::Object).collect();
            let args = serde_json::json!({ "data": rows });
            store
                .execute(StorageRequest::new(&table.model, Operation::CreateMany, args))
                .await
                .with_context(|| format!("failed to load {} batch {batch_no}", table.model))?;
            written += chunk.len();
        }
        info!(model = %table.model, rows = written, "table loaded");
        summary.tables.push((table.model, written));
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::crypto::{Envelope, FieldCipher, FieldKey, KEY_LEN};
    use crate::interceptor::Interceptor;
    use crate::schema::{EntityRegistry, FieldsConfig};
    use crate::store::{MemoryStore, NdjsonSink};

    fn interceptor() -> Interceptor {
        Interceptor::new(
            Arc::new(FieldCipher::new(FieldKey::from_bytes([0x42; KEY_LEN])).unwrap()),
            Arc::new(EntityRegistry::new(&FieldsConfig::clinic_defaults())),
        )
    }

    const SEED: &str = r#"[
        {"model": "users", "rows": [
            {"id": 1, "username": "carlos", "phone_number": "5551234567", "role": "patient"},
            {"id": 2, "username": "dra.ruiz", "phone_number": "5550001111", "role": "doctor"},
            {"id": 3, "username": "lucia", "phone_number": "", "role": "patient"}
        ]},
        {"model": "appointments", "rows": [
            {"id": 1, "patient_id": 1, "doctor_id": 2}
        ]}
    ]"#;

    #[tokio::test]
    async fn writes_encrypted_ndjson() {
        let store = EncryptedStore::new(NdjsonSink::new(Vec::new()), interceptor());
        let summary = load(&store, parse_seed(SEED).unwrap(), 2).await.unwrap();
        assert_eq!(
            summary.tables,
            vec![("users".to_owned(), 3), ("appointments".to_owned(), 1)]
        );
        assert_eq!(summary.total(), 4);

        let bytes = store.into_inner().into_inner().unwrap();
        let lines: Vec<Value> = String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 4);

        let carlos = &lines[0]["data"];
        assert!(Envelope::parse(carlos["phone_number"].as_str().unwrap()).is_ok());
        assert!(Envelope::parse(carlos["username"].as_str().unwrap()).is_ok());
        assert_eq!(carlos["role"], "patient");
        assert_eq!(lines[2]["data"]["phone_number"], "");
        assert_eq!(lines[3], serde_json::json!({
            "model": "appointments",
            "data": {"id": 1, "patient_id": 1, "doctor_id": 2}
        }));
    }

    #[tokio::test]
    async fn loaded_rows_are_searchable_at_runtime() {
        let store = EncryptedStore::new(MemoryStore::new(), interceptor());
        load(&store, parse_seed(SEED).unwrap(), 500).await.unwrap();

        let found = store
            .execute(StorageRequest::new(
                "users",
                Operation::FindFirst,
                serde_json::json!({"where": {"phone_number": "5550001111"}}),
            ))
            .await
            .unwrap();
        assert_eq!(found["username"], "dra.ruiz");
    }

    #[tokio::test]
    async fn zero_batch_size_rejected() {
        let store = EncryptedStore::new(MemoryStore::new(), interceptor());
        assert!(load(&store, Vec::new(), 0).await.is_err());
    }

    #[test]
    fn rejects_bad_seed_shape() {
        assert!(parse_seed(r#"{"users": []}"#).is_err());
    }
}
