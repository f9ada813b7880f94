//! [`MemoryStore`]: in-process table store.
//!
//! Each entity type is a table of JSON objects. Rows get a UUID `id` on
//! insert when the caller does not supply one, and `id` is unique per table.
//! Filters support direct equality, `equals`, `not`, `in`, `notIn`, and the
//! `AND` / `OR` / `NOT` combinators. Relation includes are not resolved.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use super::{Operation, StorageRequest, Store, StoreError};

type Row = Map<String, Value>;

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw rows of `model` exactly as stored, bypassing any interceptor.
    pub async fn raw_rows(&self, model: &str) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(model)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn execute(&self, request: StorageRequest) -> Result<Value, StoreError> {
        let StorageRequest {
            model,
            operation,
            args,
        } = request;
        debug!(model = %model, operation = %operation, "memory store call");

        let filter = args.get("where").unwrap_or(&Value::Null);
        check_filter(filter)?;

        match operation {
            Operation::Create => {
                let data = object_arg(&args, "data")?;
                let mut tables = self.tables.write().await;
                let table = tables.entry(model.clone()).or_default();
                insert(table, &model, data.clone()).map(Value::Object)
            }
            Operation::CreateMany => {
                let rows = match args.get("data") {
                    Some(Value::Array(items)) => items,
                    _ => return Err(StoreError::InvalidArgs("createMany needs a data array".into())),
                };
                let mut tables = self.tables.write().await;
                let existing = tables.get(&model).map(Vec::as_slice).unwrap_or_default();
                let mut staged: Vec<Row> = Vec::with_capacity(rows.len());
                for item in rows {
                    let Value::Object(row) = item else {
                        return Err(StoreError::InvalidArgs("createMany rows must be objects".into()));
                    };
                    let row = with_id(row.clone());
                    ensure_unique(existing.iter().chain(&staged), &row, &model)?;
                    staged.push(row);
                }
                let count = staged.len();
                tables.entry(model).or_default().extend(staged);
                Ok(json!({ "count": count }))
            }
            Operation::Update => {
                let data = object_arg(&args, "data")?;
                let mut tables = self.tables.write().await;
                let table = tables
                    .get_mut(&model)
                    .ok_or_else(|| StoreError::NotFound { model: model.clone() })?;
                let idx = position(table, filter)?.ok_or(StoreError::NotFound { model })?;
                let row = &mut table[idx];
                merge(row, data);
                Ok(Value::Object(row.clone()))
            }
            Operation::Upsert => {
                let create = object_arg(&args, "create")?;
                let update = object_arg(&args, "update")?;
                let mut tables = self.tables.write().await;
                let updated = match tables.get_mut(&model) {
                    Some(table) => position(table, filter)?.map(|idx| {
                        let row = &mut table[idx];
                        merge(row, update);
                        row.clone()
                    }),
                    None => None,
                };
                match updated {
                    Some(row) => Ok(Value::Object(row)),
                    None => {
                        let table = tables.entry(model.clone()).or_default();
                        insert(table, &model, create.clone()).map(Value::Object)
                    }
                }
            }
            Operation::FindUnique | Operation::FindFirst => {
                let tables = self.tables.read().await;
                let Some(table) = tables.get(&model) else {
                    return Ok(Value::Null);
                };
                Ok(position(table, filter)?
                    .map(|idx| Value::Object(table[idx].clone()))
                    .unwrap_or(Value::Null))
            }
            Operation::FindMany => {
                let skip = usize_arg(&args, "skip")?.unwrap_or(0);
                let take = usize_arg(&args, "take")?.unwrap_or(usize::MAX);
                let tables = self.tables.read().await;
                let mut out = Vec::new();
                if let Some(table) = tables.get(&model) {
                    for row in table {
                        if matches(row, filter)? {
                            out.push(Value::Object(row.clone()));
                        }
                    }
                }
                Ok(Value::Array(out.into_iter().skip(skip).take(take).collect()))
            }
            Operation::Other(name) => match name.as_str() {
                "delete" => {
                    let mut tables = self.tables.write().await;
                    let table = tables
                        .get_mut(&model)
                        .ok_or_else(|| StoreError::NotFound { model: model.clone() })?;
                    let idx = position(table, filter)?.ok_or(StoreError::NotFound { model })?;
                    Ok(Value::Object(table.remove(idx)))
                }
                "count" => {
                    let tables = self.tables.read().await;
                    let mut count = 0usize;
                    if let Some(table) = tables.get(&model) {
                        for row in table {
                            if matches(row, filter)? {
                                count += 1;
                            }
                        }
                    }
                    Ok(json!(count))
                }
                _ => Err(StoreError::Unsupported {
                    operation: name.clone(),
                }),
            },
        }
    }
}

fn object_arg<'a>(args: &'a Value, key: &str) -> Result<&'a Row, StoreError> {
    match args.get(key) {
        Some(Value::Object(map)) => Ok(map),
        _ => Err(StoreError::InvalidArgs(format!("`{key}` must be an object"))),
    }
}

fn usize_arg(args: &Value, key: &str) -> Result<Option<usize>, StoreError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| StoreError::InvalidArgs(format!("`{key}` must be a non-negative integer"))),
    }
}

fn insert(table: &mut Vec<Row>, model: &str, row: Row) -> Result<Row, StoreError> {
    let row = with_id(row);
    ensure_unique(table.iter(), &row, model)?;
    table.push(row.clone());
    Ok(row)
}

fn with_id(mut row: Row) -> Row {
    row.entry("id")
        .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
    row
}

fn ensure_unique<'a>(
    mut rows: impl Iterator<Item = &'a Row>,
    row: &Row,
    model: &str,
) -> Result<(), StoreError> {
    let id = row.get("id");
    if rows.any(|existing| existing.get("id") == id) {
        return Err(StoreError::UniqueViolation {
            model: model.to_owned(),
            field: "id".into(),
        });
    }
    Ok(())
}

fn merge(row: &mut Row, data: &Row) {
    for (k, v) in data {
        row.insert(k.clone(), v.clone());
    }
}

fn position(table: &[Row], filter: &Value) -> Result<Option<usize>, StoreError> {
    for (idx, row) in table.iter().enumerate() {
        if matches(row, filter)? {
            return Ok(Some(idx));
        }
    }
    Ok(None)
}

/// Reject malformed filters up front, so an empty table does not hide them.
fn check_filter(filter: &Value) -> Result<(), StoreError> {
    let clauses = match filter {
        Value::Null => return Ok(()),
        Value::Object(map) => map,
        _ => return Err(StoreError::InvalidArgs("`where` must be an object".into())),
    };
    for (key, cond) in clauses {
        match key.as_str() {
            "AND" | "OR" | "NOT" => {
                for clause in each_clause(cond)? {
                    check_filter(clause)?;
                }
            }
            _ => check_condition(cond)?,
        }
    }
    Ok(())
}

fn check_condition(cond: &Value) -> Result<(), StoreError> {
    let Value::Object(ops) = cond else {
        return Ok(());
    };
    for (op, expected) in ops {
        match op.as_str() {
            "equals" | "not" => {}
            "in" | "notIn" => {
                list(op, expected)?;
            }
            other => {
                return Err(StoreError::InvalidArgs(format!(
                    "unsupported filter operator `{other}`"
                )))
            }
        }
    }
    Ok(())
}

fn matches(row: &Row, filter: &Value) -> Result<bool, StoreError> {
    let clauses = match filter {
        Value::Null => return Ok(true),
        Value::Object(map) => map,
        _ => return Err(StoreError::InvalidArgs("`where` must be an object".into())),
    };
    for (key, cond) in clauses {
        let ok = match key.as_str() {
            "AND" => each_clause(cond)?.iter().try_fold(true, |acc, c| {
                Ok::<_, StoreError>(acc && matches(row, c)?)
            })?,
            "OR" => each_clause(cond)?.iter().try_fold(false, |acc, c| {
                Ok::<_, StoreError>(acc || matches(row, c)?)
            })?,
            "NOT" => !each_clause(cond)?.iter().try_fold(false, |acc, c| {
                Ok::<_, StoreError>(acc || matches(row, c)?)
            })?,
            field => field_matches(row.get(field).unwrap_or(&Value::Null), cond)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn each_clause(cond: &Value) -> Result<Vec<&Value>, StoreError> {
    match cond {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(_) => Ok(vec![cond]),
        _ => Err(StoreError::InvalidArgs(
            "AND/OR/NOT take an object or an array of objects".into(),
        )),
    }
}

fn field_matches(actual: &Value, cond: &Value) -> Result<bool, StoreError> {
    let Value::Object(ops) = cond else {
        return Ok(actual == cond);
    };
    for (op, expected) in ops {
        let ok = match op.as_str() {
            "equals" => actual == expected,
            "not" => actual != expected,
            "in" => list(op, expected)?.contains(actual),
            "notIn" => !list(op, expected)?.contains(actual),
            other => {
                return Err(StoreError::InvalidArgs(format!(
                    "unsupported filter operator `{other}`"
                )))
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn list<'a>(op: &str, v: &'a Value) -> Result<&'a Vec<Value>, StoreError> {
    v.as_array()
        .ok_or_else(|| StoreError::InvalidArgs(format!("`{op}` takes an array")))
}
