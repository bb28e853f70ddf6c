//! Free-form personal records.
//!
//! The variable-length field list is serialized to JSON and stored as a
//! single encrypted attribute, so the store sees neither the keys nor
//! the number of entries.

use serde::{Deserialize, Serialize};

use super::RecordKind;
use crate::errors::{Result, VaultError};
use crate::sync::{AttributeSpec, DecryptedView, RecordFields, RecordSchema};

pub const PERSON_SCHEMA: RecordSchema = RecordSchema {
    kind: "person",
    collection: "people",
    attributes: &[
        AttributeSpec::plaintext("name"),
        AttributeSpec::plaintext("nickname").with_default(""),
        AttributeSpec::encrypted("fields").with_default("[]"),
    ],
};

/// One labelled value of a personal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub key: String,
    pub value: String,
}

impl FieldEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalRecord {
    pub name: String,
    pub nickname: String,
    pub fields: Vec<FieldEntry>,
}

impl PersonalRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nickname: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FieldEntry::new(key, value));
        self
    }
}

impl RecordKind for PersonalRecord {
    const SCHEMA: &'static RecordSchema = &PERSON_SCHEMA;

    fn to_fields(&self) -> Result<RecordFields> {
        // Entries without a key are dropped before saving.
        let entries: Vec<&FieldEntry> = self
            .fields
            .iter()
            .filter(|f| !f.key.trim().is_empty())
            .collect();
        let encoded = serde_json::to_string(&entries)
            .map_err(|e| VaultError::SerializationError(e.to_string()))?;

        let mut fields = RecordFields::new();
        fields.insert("name".into(), self.name.clone());
        fields.insert("nickname".into(), self.nickname.clone());
        fields.insert("fields".into(), encoded);
        Ok(fields)
    }

    fn from_view(view: &DecryptedView) -> Result<Self> {
        let raw = view.get("fields");
        let fields = if raw.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(raw).map_err(|e| {
                VaultError::InvalidRecord(format!("person '{}' has malformed fields: {e}", view.id))
            })?
        };

        Ok(Self {
            name: view.get("name").to_string(),
            nickname: view.get("nickname").to_string(),
            fields,
        })
    }
}
