//! Storage abstraction the interceptor wraps.
//!
//! A [`Store`] executes one [`StorageRequest`]: an entity (model) name, an
//! [`Operation`], and the mapper-shaped JSON argument object (`data`, `where`,
//! `create`, `update`, ...). Results are plain JSON so that include graphs of
//! any depth come back in one value.

pub mod memory;
pub mod ndjson;

pub use memory::MemoryStore;
pub use ndjson::NdjsonSink;

use std::fmt;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Operation kinds the interceptor recognises. Everything else is
/// [`Operation::Other`] and passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    /// Insert one row from `data`.
    Create,
    /// Modify the row matched by `where` with `data`.
    Update,
    /// Update the `where` match with `update`, or insert `create`.
    Upsert,
    /// Insert every row of the `data` array; returns `{"count": n}`.
    CreateMany,
    /// First row matching a unique `where`, or null.
    FindUnique,
    /// First row matching `where`, or null.
    FindFirst,
    /// Every row matching `where`, honouring `skip` and `take`.
    FindMany,
    /// Any other operation name, kept verbatim.
    Other(String),
}

impl Operation {
    /// Wire name of this operation.
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Upsert => "upsert",
            Operation::CreateMany => "createMany",
            Operation::FindUnique => "findUnique",
            Operation::FindFirst => "findFirst",
            Operation::FindMany => "findMany",
            Operation::Other(name) => name,
        }
    }

    /// Whether this operation carries a write payload.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::Update | Operation::Upsert | Operation::CreateMany
        )
    }

    /// Whether this operation returns entity data.
    pub fn returns_entities(&self) -> bool {
        matches!(
            self,
            Operation::Create
                | Operation::Update
                | Operation::Upsert
                | Operation::FindUnique
                | Operation::FindFirst
                | Operation::FindMany
        )
    }
}

impl From<&str> for Operation {
    fn from(name: &str) -> Self {
        match name {
            "create" => Operation::Create,
            "update" => Operation::Update,
            "upsert" => Operation::Upsert,
            "createMany" => Operation::CreateMany,
            "findUnique" => Operation::FindUnique,
            "findFirst" => Operation::FindFirst,
            "findMany" => Operation::FindMany,
            other => Operation::Other(other.to_owned()),
        }
    }
}

impl From<String> for Operation {
    fn from(name: String) -> Self {
        Operation::from(name.as_str())
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        op.as_str().to_owned()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One storage call.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageRequest {
    /// Target entity type, e.g. `"users"`.
    pub model: String,
    /// What to do.
    pub operation: Operation,
    /// Mapper-shaped arguments. `Value::Null` when the call has none.
    pub args: Value,
}

impl StorageRequest {
    /// Construct a request.
    pub fn new(model: impl Into<String>, operation: Operation, args: Value) -> Self {
        Self {
            model: model.into(),
            operation,
            args,
        }
    }
}

/// Errors raised by a storage backend. The interceptor never creates or
/// alters these.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched a call that requires one.
    #[error("no {model} record matched the query")]
    NotFound { model: String },

    /// A unique key already exists.
    #[error("unique constraint violated on {model}.{field}")]
    UniqueViolation { model: String, field: String },

    /// The backend does not implement this operation.
    #[error("operation {operation} is not supported by this store")]
    Unsupported { operation: String },

    /// The arguments are not shaped as the operation requires.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// Backend I/O failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A storage engine.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Execute one request and return its JSON result.
    async fn execute(&self, request: StorageRequest) -> Result<Value, StoreError>;
}
