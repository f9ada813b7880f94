//! Field cipher: AES-256-CBC with random or HMAC-derived IVs.
//!
//! This module knows nothing about entities, schemas, or storage. It turns one
//! string into one envelope and back.
//!
//! # Envelope format
//!
//! ```text
//! <hex(iv, 16 bytes)>:<hex(ciphertext)>
//! ```
//!
//! Values not in this shape are legacy plaintext and are returned unchanged by
//! [`FieldCipher::decrypt`].

pub mod cipher;
pub mod key;

pub use cipher::{Envelope, FieldCipher};
pub use key::{FieldKey, KeyError, KEY_LEN};
