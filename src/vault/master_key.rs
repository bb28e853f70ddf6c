//! The per-identity master key record.
//!
//! Stored on the identity's user document as one map attribute:
//!
//! ```text
//! users/<identity> { "masterKey": { "salt": <32 bytes>, "verifier": <Envelope> } }
//! ```
//!
//! The verifier is the constant `VERIFIER_PLAINTEXT` encrypted under the
//! derived key; decrypting it back proves the passphrase without ever
//! storing the passphrase or the key.

use crate::crypto::{Envelope, Salt};
use crate::store::{Document, Fields, Value};

/// Attribute of the user document holding the record.
pub const MASTER_KEY_ATTRIBUTE: &str = "masterKey";

/// Known plaintext encrypted into the verifier.
pub const VERIFIER_PLAINTEXT: &str = "vault-verifier";

const SALT_FIELD: &str = "salt";
const VERIFIER_FIELD: &str = "verifier";

/// Salt and verifier for one identity.  Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKeyRecord {
    pub salt: Salt,
    pub verifier: Envelope,
}

impl MasterKeyRecord {
    /// Encode as the map value stored under `MASTER_KEY_ATTRIBUTE`.
    pub fn to_value(&self) -> Value {
        let mut map = Fields::new();
        map.insert(SALT_FIELD.into(), Value::Bytes(self.salt.to_vec()));
        map.insert(VERIFIER_FIELD.into(), Value::Envelope(self.verifier.clone()));
        Value::Map(map)
    }

    /// Whether `doc` carries a master key attribute at all.
    pub fn is_present(doc: &Document) -> bool {
        doc.get(MASTER_KEY_ATTRIBUTE).is_some()
    }

    /// Decode from a user document.
    ///
    /// Returns `None` if the attribute is missing or malformed.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let map = doc.get(MASTER_KEY_ATTRIBUTE)?.as_map()?;
        let salt_bytes = map.get(SALT_FIELD)?.as_bytes()?;
        let salt: Salt = salt_bytes.try_into().ok()?;
        let verifier = map.get(VERIFIER_FIELD)?.as_envelope()?.clone();
        Some(Self { salt, verifier })
    }
}
