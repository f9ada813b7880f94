//! Transparent field encryption in front of a [`Store`].
//!
//! [`EncryptedStore`] wraps any store and is itself a store. For every call on
//! a recognised [`Operation`] it:
//!
//! 1. encrypts configured fields of the target entity in write payloads and in
//!    `where` filters (deterministic mode);
//! 2. runs the inner call unchanged;
//! 3. decrypts configured fields in the result graph, following relations.
//!
//! Store errors come back exactly as the inner store raised them. Field-level
//! decrypt failures never fail a call; see [`FieldCipher::decrypt`].
//!
//! # Module invariants
//!
//! - Requests and results are transformed as owned values before they are
//!   handed on, so no caller sees a half-transformed object.
//! - The only shared state is the immutable cipher and registry.

mod decrypt;
mod encrypt;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::crypto::FieldCipher;
use crate::schema::EntityRegistry;
use crate::store::{Operation, StorageRequest, Store, StoreError};

/// Stateless payload/result transformer.
#[derive(Clone, Debug)]
pub struct Interceptor {
    cipher: Arc<FieldCipher>,
    registry: Arc<EntityRegistry>,
}

impl Interceptor {
    /// Bind a cipher to a registry.
    pub fn new(cipher: Arc<FieldCipher>, registry: Arc<EntityRegistry>) -> Self {
        Self { cipher, registry }
    }
}

/// A [`Store`] decorator that applies an [`Interceptor`] to every call.
#[derive(Debug)]
pub struct EncryptedStore<S> {
    inner: S,
    interceptor: Interceptor,
}

impl<S: Store> EncryptedStore<S> {
    /// Wrap `inner`.
    pub fn new(inner: S, interceptor: Interceptor) -> Self {
        Self { inner, interceptor }
    }

    /// The wrapped store, for access that must bypass encryption.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap the inner store.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: Store> Store for EncryptedStore<S> {
    async fn execute(&self, mut request: StorageRequest) -> Result<Value, StoreError> {
        if let Operation::Other(name) = &request.operation {
            debug!(model = %request.model, operation = %name, "passing through unintercepted operation");
            return self.inner.execute(request).await;
        }

        let model = request.model.clone();
        let operation = request.operation.clone();

        self.interceptor.encrypt_request(&mut request);
        let mut result = self.inner.execute(request).await?;

        if operation.returns_entities() {
            self.interceptor.decrypt_result(&model, &mut result);
        }
        debug!(
            model = %model,
            operation = %operation,
            write = operation.is_write(),
            "intercepted storage call"
        );
        Ok(result)
    }
}
