//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The iteration count is fixed at 600 000 so that every vault, on every
//! device, re-derives the same key from the same passphrase and salt.
//! The cost is paid on purpose: it is the only brake on offline guessing.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use super::keys::{SymmetricKey, KEY_LEN};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Number of PBKDF2 rounds.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// A per-identity random salt.
pub type Salt = [u8; SALT_LEN];

/// Derive the 32-byte vault key from a passphrase and salt.
///
/// Deterministic and pure: the same passphrase + salt always produce
/// the same key.  The salt length is enforced by the type.
pub fn derive_key(passphrase: &str, salt: &Salt) -> SymmetricKey {
    let mut bytes = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut bytes);
    let key = SymmetricKey::new(bytes);
    zeroize::Zeroize::zeroize(&mut bytes);
    key
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> Salt {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
