//! Vault module: master key setup, unlock, and the live session.
//!
//! This module provides:
//! - The persisted `MasterKeyRecord` (salt + verifier envelope) (`master_key`)
//! - `UnlockProtocol`: has-vault / setup / unlock against the store (`unlock`)
//! - `VaultSession`: the per-identity lock state holding the live key (`session`)
//! - Identity types and sign-out tracking (`identity`)

pub mod identity;
pub mod master_key;
pub mod session;
pub mod unlock;

// Re-export the most commonly used items.
pub use identity::{track_identity, Identity, IdentityProvider, StaticIdentityProvider};
pub use master_key::{MasterKeyRecord, MASTER_KEY_ATTRIBUTE, VERIFIER_PLAINTEXT};
pub use session::{VaultSession, VaultSessionState};
pub use unlock::UnlockProtocol;
