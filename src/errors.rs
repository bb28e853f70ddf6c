use thiserror::Error;

use crate::store::StoreError;

/// All errors that can occur in PassVault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Wrong key or tampered data. Deliberately carries no detail.
    #[error("Decryption failed: wrong master passphrase or corrupted record")]
    Authentication,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Unlock protocol errors ---
    #[error("Invalid master passphrase")]
    InvalidPassphrase,

    #[error("Vault is already initialized for this identity")]
    AlreadyInitialized,

    #[error("Master passphrase must be at least {0} characters")]
    WeakPassphrase(usize),

    // --- Session errors ---
    #[error("Vault is locked")]
    Locked,

    // --- Record errors ---
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Unknown record kind '{0}' (expected credential, contact or person)")]
    UnknownRecordKind(String),

    #[error("Record '{0}' not found")]
    RecordNotFound(String),

    // --- Store errors (propagated unchanged) ---
    #[error(transparent)]
    Store(#[from] StoreError),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

/// Convenience type alias for PassVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
