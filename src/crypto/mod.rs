//! Cryptographic primitives for PassVault.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 master key derivation (`kdf`)
//! - The `SymmetricKey` type that holds the derived key in memory (`keys`)
//! - AES-256-GCM per-field envelope encryption (`envelope`)

pub mod envelope;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt_field, decrypt_field, derive_key, ...};
pub use envelope::{decrypt_field, encrypt_field, Envelope, IV_LEN};
pub use kdf::{derive_key, generate_salt, Salt, PBKDF2_ITERATIONS, SALT_LEN};
pub use keys::{SymmetricKey, KEY_LEN};
