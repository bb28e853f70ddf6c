//! Master passphrase setup and unlock verification.
//!
//! `setup` is the only place a `MasterKeyRecord` is ever written.
//! `unlock` folds every failure (no record, malformed record, wrong
//! passphrase) into `VaultError::InvalidPassphrase` so the caller cannot
//! tell them apart.  There is no attempt counter or lockout: brute-force
//! resistance comes from the PBKDF2 cost alone.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::identity::Identity;
use super::master_key::{MasterKeyRecord, MASTER_KEY_ATTRIBUTE, VERIFIER_PLAINTEXT};
use crate::crypto::{decrypt_field, derive_key, encrypt_field, generate_salt, Salt, SymmetricKey};
use crate::errors::{Result, VaultError};
use crate::store::{user_path, DocumentStore, Fields};

/// Default minimum master passphrase length.
pub const DEFAULT_MIN_PASSPHRASE_LEN: usize = 8;

/// Reads and writes master key records through a `DocumentStore`.
#[derive(Clone)]
pub struct UnlockProtocol {
    store: Arc<dyn DocumentStore>,
    min_passphrase_len: usize,
}

impl UnlockProtocol {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            min_passphrase_len: DEFAULT_MIN_PASSPHRASE_LEN,
        }
    }

    /// Override the minimum passphrase length enforced by `setup`.
    pub fn with_min_passphrase_len(mut self, len: usize) -> Self {
        self.min_passphrase_len = len;
        self
    }

    /// Whether `identity` has completed vault setup.
    pub async fn has_vault(&self, identity: &Identity) -> Result<bool> {
        let doc = self.store.get_document(&user_path(&identity.id)).await?;
        Ok(doc.as_ref().is_some_and(MasterKeyRecord::is_present))
    }

    /// Create the master key record and return the derived key.
    ///
    /// Fails with `AlreadyInitialized` if a record exists (which is then
    /// left untouched) and with `WeakPassphrase` if the passphrase is
    /// shorter than the configured minimum.
    pub async fn setup(&self, identity: &Identity, passphrase: &str) -> Result<SymmetricKey> {
        if passphrase.chars().count() < self.min_passphrase_len {
            return Err(VaultError::WeakPassphrase(self.min_passphrase_len));
        }

        let path = user_path(&identity.id);
        let existing = self.store.get_document(&path).await?;
        if existing.as_ref().is_some_and(MasterKeyRecord::is_present) {
            warn!(identity = %identity.id, "setup refused: vault already initialized");
            return Err(VaultError::AlreadyInitialized);
        }

        let salt = generate_salt();
        let key = derive_key_blocking(passphrase, salt).await?;
        let verifier = encrypt_field(VERIFIER_PLAINTEXT, &key)?;
        let record = MasterKeyRecord { salt, verifier };

        let mut fields = Fields::new();
        fields.insert(MASTER_KEY_ATTRIBUTE.to_string(), record.to_value());

        // Keep any other attributes of an existing user document.
        if existing.is_some() {
            self.store.update_fields(&path, fields).await?;
        } else {
            self.store.put_document(&path, fields).await?;
        }

        info!(identity = %identity.id, "vault initialized");
        Ok(key)
    }

    /// Re-derive the key from `passphrase` and check it against the verifier.
    pub async fn unlock(&self, identity: &Identity, passphrase: &str) -> Result<SymmetricKey> {
        let doc = self.store.get_document(&user_path(&identity.id)).await?;

        let Some(record) = doc.as_ref().and_then(MasterKeyRecord::from_document) else {
            debug!(identity = %identity.id, "unlock attempted without a usable master key record");
            return Err(VaultError::InvalidPassphrase);
        };

        let key = derive_key_blocking(passphrase, record.salt).await?;

        let verified = decrypt_field(&record.verifier, &key)
            .map(Zeroizing::new)
            .is_ok_and(|plain| bool::from(plain.as_bytes().ct_eq(VERIFIER_PLAINTEXT.as_bytes())));

        if !verified {
            warn!(identity = %identity.id, "unlock failed");
            return Err(VaultError::InvalidPassphrase);
        }

        info!(identity = %identity.id, "vault unlocked");
        Ok(key)
    }
}

/// Run the deliberately slow KDF on the blocking pool.
async fn derive_key_blocking(passphrase: &str, salt: Salt) -> Result<SymmetricKey> {
    let passphrase = Zeroizing::new(passphrase.to_string());
    tokio::task::spawn_blocking(move || derive_key(&passphrase, &salt))
        .await
        .map_err(|e| VaultError::KeyDerivationFailed(format!("derivation task failed: {e}")))
}
