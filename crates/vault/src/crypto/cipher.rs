//! AES-256-CBC encryption and decryption of individual string fields.
//!
//! Two IV strategies share one key:
//!
//! - **Random**: a fresh 16-byte IV per call. Same plaintext, different
//!   envelope every time. Use for values that are stored but never searched.
//! - **Deterministic**: the IV is the first 16 bytes of HMAC-SHA256 over the
//!   plaintext. Same plaintext + key always yields the same envelope, which is
//!   what lets equality filters match stored ciphertext. An observer can tell
//!   when two deterministic fields hold the same value.
//!
//! Decryption never fails from the caller's point of view: anything that is
//! not a well-formed envelope is treated as legacy plaintext, and anything that
//! is well-formed but does not decrypt is logged and returned as stored.

use std::fmt;

use aes::cipher::{
    block_padding::Pkcs7, generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut,
    KeyIvInit,
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, warn};

use super::key::FieldKey;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Byte length of a CBC initialisation vector (one AES block).
pub const IV_LEN: usize = 16;

/// Separator between the hex IV and the hex ciphertext.
pub const SEPARATOR: char = ':';

/// A parsed ciphertext envelope.
///
/// The string representation is `<hex(iv)>:<hex(ciphertext)>`, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Raw IV bytes.
    pub iv: [u8; IV_LEN],
    /// Raw PKCS#7-padded ciphertext bytes.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Parse an envelope string.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidFormat`] unless the string is exactly two
    /// colon-separated hex parts with a 16-byte IV.
    pub fn parse(s: &str) -> Result<Self, CipherError> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        let [iv_hex, ct_hex] = parts.as_slice() else {
            return Err(CipherError::InvalidFormat);
        };
        let iv_bytes = hex::decode(iv_hex).map_err(|_| CipherError::InvalidFormat)?;
        let iv: [u8; IV_LEN] = iv_bytes
            .try_into()
            .map_err(|_| CipherError::InvalidFormat)?;
        let ciphertext = hex::decode(ct_hex).map_err(|_| CipherError::InvalidFormat)?;
        Ok(Self { iv, ciphertext })
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}",
            hex::encode(self.iv),
            hex::encode(&self.ciphertext)
        )
    }
}

/// Errors produced by the cipher layer.
///
/// Only [`CipherError::InvalidKey`] ever reaches a caller, from
/// [`FieldCipher::new`]. The rest never escape [`FieldCipher::decrypt`]; they
/// exist so the parse and open steps can be composed with `?` and logged in
/// one place.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The value is not an `iv:ciphertext` hex envelope.
    #[error("invalid envelope format")]
    InvalidFormat,

    /// Padding check failed: wrong key, truncated or corrupted ciphertext.
    #[error("ciphertext did not unpad")]
    Unpad,

    /// Decrypted bytes are not valid UTF-8.
    #[error("decrypted bytes are not valid UTF-8")]
    NotUtf8,

    /// The key was rejected while building the HMAC for IV derivation.
    #[error("field key rejected by HMAC-SHA256")]
    InvalidKey,
}

/// Field cipher bound to one process-wide key.
///
/// Stateless per call and cheap to share behind an `Arc`.
pub struct FieldCipher {
    key: FieldKey,
    mac: HmacSha256,
}

impl FieldCipher {
    /// Build a cipher around `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKey`] if the HMAC rejects the key.
    pub fn new(key: FieldKey) -> Result<Self, CipherError> {
        let mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
            .map_err(|_| CipherError::InvalidKey)?;
        Ok(Self { key, mac })
    }

    /// Encrypt with a fresh random IV.
    pub fn encrypt_random(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }
        let mut iv = [0u8; IV_LEN];
        rand::rng().fill_bytes(&mut iv);
        self.seal(iv, plaintext).to_string()
    }

    /// Encrypt with an IV derived from the plaintext, so equal inputs give
    /// equal envelopes.
    pub fn encrypt_deterministic(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }
        self.seal(self.derive_iv(plaintext), plaintext).to_string()
    }

    /// Decrypt an envelope string.
    ///
    /// Legacy plaintext comes back unchanged. A well-formed envelope that does
    /// not decrypt is logged and also comes back unchanged.
    pub fn decrypt(&self, stored: &str) -> String {
        if stored.is_empty() {
            return String::new();
        }
        let envelope = match Envelope::parse(stored) {
            Ok(e) => e,
            Err(_) => {
                debug!("value is not an envelope; treating as plaintext");
                return stored.to_owned();
            }
        };
        match self.open(&envelope) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!(error = %e, "field decryption failed; returning stored value");
                stored.to_owned()
            }
        }
    }

    fn derive_iv(&self, plaintext: &str) -> [u8; IV_LEN] {
        let mut mac = self.mac.clone();
        mac.update(plaintext.as_bytes());
        let digest = mac.finalize().into_bytes();
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&digest[..IV_LEN]);
        iv
    }

    fn seal(&self, iv: [u8; IV_LEN], plaintext: &str) -> Envelope {
        let key = GenericArray::from_slice(self.key.as_bytes());
        let ciphertext =
            Aes256CbcEnc::new(key, &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        Envelope { iv, ciphertext }
    }

    fn open(&self, envelope: &Envelope) -> Result<String, CipherError> {
        let key = GenericArray::from_slice(self.key.as_bytes());
        let bytes = Aes256CbcDec::new(key, &envelope.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&envelope.ciphertext)
            .map_err(|_| CipherError::Unpad)?;
        String::from_utf8(bytes).map_err(|_| CipherError::NotUtf8)
    }
}

impl fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCipher")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;

    fn cipher(fill: u8) -> FieldCipher {
        FieldCipher::new(FieldKey::from_bytes([fill; KEY_LEN])).unwrap()
    }

    #[test]
    fn deterministic_round_trip() {
        let c = cipher(0x42);
        let env = c.encrypt_deterministic("5551234567");
        assert_ne!(env, "5551234567");
        assert_eq!(c.decrypt(&env), "5551234567");
    }

    #[test]
    fn random_round_trip() {
        let c = cipher(0x42);
        let env = c.encrypt_random("dolor de cabeza");
        assert_eq!(c.decrypt(&env), "dolor de cabeza");
    }

    #[test]
    fn deterministic_is_stable() {
        let c = cipher(0x42);
        assert_eq!(c.encrypt_deterministic("carlos"), c.encrypt_deterministic("carlos"));
    }

    #[test]
    fn random_differs_between_calls() {
        let c = cipher(0x42);
        assert_ne!(c.encrypt_random("carlos"), c.encrypt_random("carlos"));
    }

    #[test]
    fn distinct_plaintexts_distinct_envelopes() {
        let c = cipher(0x42);
        let a = c.encrypt_deterministic("5551234567");
        let b = c.encrypt_deterministic("5551234568");
        assert_ne!(a, b);
        assert_ne!(a.split(':').next(), b.split(':').next());
    }

    #[test]
    fn envelope_shape() {
        let c = cipher(0x42);
        let env = c.encrypt_deterministic("hello");
        let (iv, ct) = env.split_once(':').unwrap();
        assert_eq!(iv.len(), IV_LEN * 2);
        // "hello" pads to a single AES block.
        assert_eq!(ct.len(), 32);
        assert!(env.chars().all(|ch| ch == ':' || ch.is_ascii_hexdigit()));
        assert_eq!(Envelope::parse(&env).unwrap().to_string(), env);
    }

    #[test]
    fn full_block_plaintext_gets_extra_padding_block() {
        let c = cipher(0x42);
        let env = c.encrypt_deterministic("0123456789abcdef");
        let (_, ct) = env.split_once(':').unwrap();
        assert_eq!(ct.len(), 64);
    }

    #[test]
    fn plaintext_without_separator_is_returned() {
        let c = cipher(0x42);
        assert_eq!(c.decrypt("plainvalue"), "plainvalue");
    }

    #[test]
    fn non_hex_or_short_iv_is_returned() {
        let c = cipher(0x42);
        assert_eq!(c.decrypt("10:30"), "10:30");
        assert_eq!(c.decrypt("zz:yy"), "zz:yy");
        assert_eq!(c.decrypt("a:b:c"), "a:b:c");
    }

    #[test]
    fn wrong_key_returns_stored_value() {
        let env = cipher(0x01).encrypt_deterministic("secret note");
        assert_eq!(cipher(0x02).decrypt(&env), env);
    }

    #[test]
    fn truncated_ciphertext_returns_stored_value() {
        let c = cipher(0x42);
        let env = c.encrypt_deterministic("truncate me please");
        let truncated = &env[..env.len() - 2];
        assert_eq!(c.decrypt(truncated), truncated);
    }

    #[test]
    fn empty_string_passes_through() {
        let c = cipher(0x42);
        assert_eq!(c.encrypt_deterministic(""), "");
        assert_eq!(c.encrypt_random(""), "");
        assert_eq!(c.decrypt(""), "");
    }

    #[test]
    fn unicode_round_trip() {
        let c = cipher(0x42);
        let env = c.encrypt_deterministic("José Núñez — 診察");
        assert_eq!(c.decrypt(&env), "José Núñez — 診察");
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        assert!(Envelope::parse("nocolon").is_err());
        assert!(Envelope::parse("00:").is_err());
        assert!(Envelope::parse(&format!("{}:zz", "00".repeat(IV_LEN))).is_err());
        assert!(Envelope::parse(&format!("{}:00", "00".repeat(IV_LEN))).is_ok());
    }

    #[test]
    fn any_field_key_builds_a_cipher() {
        assert!(FieldCipher::new(FieldKey::from_bytes([0u8; KEY_LEN])).is_ok());
        assert!(FieldCipher::new(FieldKey::ephemeral()).is_ok());
    }

    #[test]
    fn debug_does_not_leak_key() {
        let c = cipher(0xAB);
        let dbg = format!("{c:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("171"));
    }
}
