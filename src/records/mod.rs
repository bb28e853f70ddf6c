//! Typed record kinds on top of the generic synchronizer.
//!
//! Each kind declares its `RecordSchema` and converts to and from the
//! synchronizer's plain attribute maps.

pub mod contact;
pub mod credential;
pub mod person;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::errors::{Result, VaultError};
use crate::sync::{DecryptedView, RecordFields, RecordId, RecordSchema, Snapshot};

pub use contact::{Contact, CONTACT_SCHEMA};
pub use credential::{Credential, CREDENTIAL_SCHEMA};
pub use person::{FieldEntry, PersonalRecord, PERSON_SCHEMA};

/// A record type stored in its own encrypted collection.
pub trait RecordKind: Sized {
    const SCHEMA: &'static RecordSchema;

    /// Attribute map handed to `create` / `update`.
    fn to_fields(&self) -> Result<RecordFields>;

    /// Rebuild from a decrypted view.
    fn from_view(view: &DecryptedView) -> Result<Self>;
}

/// A typed record together with its store metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored<T> {
    pub id: RecordId,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub record: T,
}

impl<T: RecordKind> Stored<T> {
    pub fn from_view(view: &DecryptedView) -> Result<Self> {
        Ok(Self {
            id: view.id.clone(),
            created_at: view.created_at,
            updated_at: view.updated_at,
            record: T::from_view(view)?,
        })
    }
}

/// Convert every record of a snapshot into `T`, keeping order.
pub fn decode_snapshot<T: RecordKind>(snapshot: &Snapshot) -> Result<Vec<Stored<T>>> {
    snapshot.records.iter().map(Stored::from_view).collect()
}

/// Record kind selector used by the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Credential,
    Contact,
    Person,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Credential, Kind::Contact, Kind::Person];

    pub fn schema(self) -> &'static RecordSchema {
        match self {
            Kind::Credential => Credential::SCHEMA,
            Kind::Contact => Contact::SCHEMA,
            Kind::Person => PersonalRecord::SCHEMA,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.schema().kind
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credential" | "credentials" | "password" | "passwords" => Ok(Kind::Credential),
            "contact" | "contacts" => Ok(Kind::Contact),
            "person" | "people" | "personal" => Ok(Kind::Person),
            other => Err(VaultError::UnknownRecordKind(other.to_string())),
        }
    }
}

/// `Some(value)` unless `value` is empty.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
