//! [`FieldKey`]: the process-wide 32-byte field encryption key.

use rand::RngCore;
use thiserror::Error;
use tracing::warn;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::config::AppEnv;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Errors produced while loading key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No key was configured.
    #[error("ENCRYPTION_KEY is not set")]
    Missing,

    /// The configured key is neither 64 hex characters nor 32 raw bytes.
    #[error("ENCRYPTION_KEY has invalid length: expected {KEY_LEN} raw bytes or 64 hex characters, got {0} bytes")]
    InvalidLength(usize),
}

/// Fixed-size key buffer holding exactly [`KEY_LEN`] bytes.
///
/// Zeroed on drop. `Debug` never prints the bytes.
pub struct FieldKey(Box<Zeroizing<[u8; KEY_LEN]>>);

impl FieldKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Box::new(Zeroizing::new(bytes)))
    }

    /// Parse configured key material.
    ///
    /// 64 hex characters are decoded; otherwise the string's bytes are used
    /// directly and must number exactly [`KEY_LEN`].
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] for any other shape.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let raw = raw.trim();
        if raw.len() == KEY_LEN * 2 {
            if let Ok(decoded) = hex::decode(raw) {
                return Self::from_slice(&decoded);
            }
        }
        Self::from_slice(raw.as_bytes())
    }

    /// A fresh random key. Anything encrypted under it is lost with the process.
    pub fn ephemeral() -> Self {
        let mut buf = Box::new(Zeroizing::new([0u8; KEY_LEN]));
        rand::rng().fill_bytes(buf.as_mut_slice());
        Self(buf)
    }

    /// Resolve the startup key for `env`.
    ///
    /// Production refuses to start without a valid key. Development falls back
    /// to an [`ephemeral`](Self::ephemeral) key and says so loudly.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`KeyError`] in production.
    pub fn resolve(raw: Option<&str>, env: AppEnv) -> Result<Self, KeyError> {
        let parsed = match raw {
            Some(r) if !r.trim().is_empty() => Self::parse(r),
            _ => Err(KeyError::Missing),
        };
        match (parsed, env) {
            (Ok(key), _) => Ok(key),
            (Err(e), AppEnv::Production) => Err(e),
            (Err(e), AppEnv::Development) => {
                warn!(
                    error = %e,
                    "no usable encryption key; using an EPHEMERAL random key. \
                     Data encrypted in this run cannot be read after restart"
                );
                Ok(Self::ephemeral())
            }
        }
    }

    /// Borrow the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
        Ok(Self::from_bytes(arr))
    }
}

impl ZeroizeOnDrop for FieldKey {}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldKey([REDACTED])")
    }
}
