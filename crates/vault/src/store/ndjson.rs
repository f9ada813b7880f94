//! [`NdjsonSink`]: write-only store that emits one JSON line per row.
//!
//! Used by the bulk loader to produce import-ready rows. Each line is
//! `{"model": "<entity>", "data": {...}}`. Reads are not supported.

use std::io::Write;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use super::{Operation, StorageRequest, Store, StoreError};

#[derive(Serialize)]
struct Line<'a> {
    model: &'a str,
    data: &'a Map<String, Value>,
}

/// Sink over any writer.
pub struct NdjsonSink<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> NdjsonSink<W> {
    /// Wrap `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Flush and return the writer.
    ///
    /// # Errors
    ///
    /// Returns the flush error, if any.
    pub fn into_inner(self) -> Result<W, StoreError> {
        let mut out = self.out.into_inner();
        out.flush()?;
        Ok(out)
    }
}

#[async_trait]
impl<W: Write + Send> Store for NdjsonSink<W> {
    async fn execute(&self, request: StorageRequest) -> Result<Value, StoreError> {
        let rows: Vec<&Map<String, Value>> = match (&request.operation, request.args.get("data")) {
            (Operation::Create, Some(Value::Object(row))) => vec![row],
            (Operation::CreateMany, Some(Value::Array(items))) => items
                .iter()
                .map(|v| {
                    v.as_object()
                        .ok_or_else(|| StoreError::InvalidArgs("createMany rows must be objects".into()))
                })
                .collect::<Result<_, _>>()?,
            (Operation::Create | Operation::CreateMany, _) => {
                return Err(StoreError::InvalidArgs("`data` has the wrong shape".into()))
            }
            (op, _) => {
                return Err(StoreError::Unsupported {
                    operation: op.to_string(),
                })
            }
        };

        let mut out = self.out.lock().await;
        for data in &rows {
            let line = Line {
                model: &request.model,
                data,
            };
            serde_json::to_writer(&mut *out, &line).map_err(std::io::Error::from)?;
            out.write_all(b"\n")?;
        }

        Ok(match request.operation {
            Operation::CreateMany => json!({ "count": rows.len() }),
            _ => Value::Object(rows[0].clone()),
        })
    }
}
