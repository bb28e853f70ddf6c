//! AES-256-GCM field envelopes.
//!
//! Every sensitive attribute is stored as its own `Envelope`: a fresh
//! random 12-byte IV plus the ciphertext with the 16-byte auth tag
//! appended.  In serialized form both parts are base64 strings:
//!
//! ```text
//! { "iv": "<base64, 12 bytes>", "ciphertext": "<base64, len(plaintext) + 16 bytes>" }
//! ```

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::keys::SymmetricKey;
use crate::errors::{Result, VaultError};

/// Size of the AES-256-GCM nonce in bytes.
pub const IV_LEN: usize = 12;

/// One encrypted value: IV + authenticated ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,
}

/// Encrypt a UTF-8 `plaintext` under `key` with a freshly generated IV.
pub fn encrypt_field(plaintext: &str, key: &SymmetricKey) -> Result<Envelope> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    Ok(Envelope {
        iv: nonce.to_vec(),
        ciphertext,
    })
}

/// Decrypt an `Envelope` produced by `encrypt_field`.
///
/// Any failure (wrong key, altered IV or ciphertext, bad IV length,
/// non-UTF-8 plaintext) is reported as `VaultError::Authentication`.
pub fn decrypt_field(envelope: &Envelope, key: &SymmetricKey) -> Result<String> {
    if envelope.iv.len() != IV_LEN {
        return Err(VaultError::Authentication);
    }
    let nonce = Nonce::from_slice(&envelope.iv);

    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| VaultError::Authentication)?;

    let plaintext = cipher
        .decrypt(nonce, envelope.ciphertext.as_slice())
        .map_err(|_| VaultError::Authentication)?;

    String::from_utf8(plaintext).map_err(|e| {
        let mut bad_bytes = e.into_bytes();
        bad_bytes.zeroize();
        VaultError::Authentication
    })
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
