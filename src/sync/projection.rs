//! Encoding records into store fields and projecting documents back into
//! decrypted views.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::schema::{AttributeSpec, Protection, RecordSchema, CREATED_AT, UPDATED_AT};
use crate::config::DecryptFailurePolicy;
use crate::crypto::{decrypt_field, encrypt_field, SymmetricKey};
use crate::errors::{Result, VaultError};
use crate::store::{Document, Fields, Value};

/// Opaque record identifier (the document id).
pub type RecordId = String;

/// Attribute name to plaintext value, as the caller sees a record.
pub type RecordFields = BTreeMap<String, String>;

/// One record with every encrypted attribute replaced by its plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedView {
    pub id: RecordId,
    pub fields: RecordFields,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DecryptedView {
    /// Value of `name`, or `""` if the record does not carry it.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }
}

/// A complete decrypted collection, as pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Strictly increasing per subscription, starting at 1.
    pub sequence: u64,
    /// Records in store order (newest first).
    pub records: Vec<DecryptedView>,
    /// Ids that failed to decrypt.  Only filled under `SkipRecord`.
    pub undecryptable: Vec<RecordId>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&DecryptedView> {
        self.records.iter().find(|r| r.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    Create,
    Update,
}

/// Build the store fields for a create or update.
///
/// Unknown attributes are rejected.  Empty values fall back to the
/// attribute default; optional attributes still empty are omitted on
/// create and cleared on update.  Timestamps are added as server
/// sentinels.
pub(crate) fn encode_fields(
    schema: &RecordSchema,
    fields: &RecordFields,
    key: &SymmetricKey,
    mode: WriteMode,
) -> Result<Fields> {
    if let Some(unknown) = fields.keys().find(|k| schema.attribute(k).is_none()) {
        return Err(VaultError::InvalidRecord(format!(
            "{} has no attribute '{unknown}'",
            schema.kind
        )));
    }

    let mut out = Fields::new();
    for spec in schema.attributes {
        let given = fields.get(spec.name).map(String::as_str);
        let value = given.filter(|v| !v.is_empty()).or(spec.default);

        let stored = match (value, given) {
            (Some(v), _) => Some(encode_value(spec, v, key)?),
            (None, given) if !spec.is_optional() => match given {
                Some(empty) => Some(encode_value(spec, empty, key)?),
                None => {
                    return Err(VaultError::InvalidRecord(format!(
                        "{} requires '{}'",
                        schema.kind, spec.name
                    )))
                }
            },
            (None, _) => match mode {
                WriteMode::Create => None,
                WriteMode::Update => Some(Value::Null),
            },
        };

        if let Some(stored) = stored {
            out.insert(spec.name.to_string(), stored);
        }
    }

    if mode == WriteMode::Create {
        out.insert(CREATED_AT.to_string(), Value::ServerTimestamp);
    }
    out.insert(UPDATED_AT.to_string(), Value::ServerTimestamp);
    Ok(out)
}

fn encode_value(spec: &AttributeSpec, plaintext: &str, key: &SymmetricKey) -> Result<Value> {
    Ok(match spec.protection {
        Protection::Plaintext => Value::from(plaintext),
        Protection::Encrypted => Value::Envelope(encrypt_field(plaintext, key)?),
    })
}

/// Reconstruct one document.  Any decrypt problem is `Authentication`.
pub(crate) fn decode_document(
    schema: &RecordSchema,
    doc: &Document,
    key: &SymmetricKey,
) -> Result<DecryptedView> {
    let mut fields = RecordFields::new();

    for spec in schema.attributes {
        let plaintext = match spec.protection {
            Protection::Plaintext => doc
                .get(spec.name)
                .and_then(Value::as_str)
                .or(spec.default)
                .unwrap_or_default()
                .to_string(),
            Protection::Encrypted => match doc.get(spec.name) {
                Some(Value::Envelope(envelope)) => decrypt_field(envelope, key)?,
                Some(_) => return Err(VaultError::Authentication),
                None => match spec.default {
                    Some(default) => default.to_string(),
                    None if spec.is_optional() => String::new(),
                    None => return Err(VaultError::Authentication),
                },
            },
        };
        fields.insert(spec.name.to_string(), plaintext);
    }

    Ok(DecryptedView {
        id: doc.id.clone(),
        fields,
        created_at: doc.get(CREATED_AT).and_then(Value::as_timestamp),
        updated_at: doc.get(UPDATED_AT).and_then(Value::as_timestamp),
    })
}

/// Result of projecting one change batch.
#[derive(Debug, Default)]
pub(crate) struct Projection {
    pub records: Vec<DecryptedView>,
    pub undecryptable: Vec<RecordId>,
}

/// Decrypt a whole batch, preserving its order.
pub(crate) fn project_batch(
    schema: &RecordSchema,
    docs: &[Document],
    key: &SymmetricKey,
    policy: DecryptFailurePolicy,
) -> Projection {
    let mut projection = Projection::default();

    for doc in docs {
        match decode_document(schema, doc, key) {
            Ok(view) => projection.records.push(view),
            Err(_) => match policy {
                DecryptFailurePolicy::DiscardBatch => {
                    warn!(
                        kind = schema.kind,
                        record = %doc.id,
                        batch = docs.len(),
                        "record failed to decrypt, discarding batch"
                    );
                    return Projection::default();
                }
                DecryptFailurePolicy::SkipRecord => {
                    warn!(kind = schema.kind, record = %doc.id, "record failed to decrypt, skipping");
                    projection.undecryptable.push(doc.id.clone());
                }
            },
        }
    }

    projection
}
