//! Document and attribute value types.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::envelope::{base64_decode, base64_encode};
use crate::crypto::Envelope;

/// Named attributes of a document.
pub type Fields = BTreeMap<String, Value>;

/// One attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    String(String),
    Bytes(
        #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")] Vec<u8>,
    ),
    Envelope(Envelope),
    Timestamp(DateTime<Utc>),
    Map(Fields),
    /// Write-only sentinel: the store replaces it with its own clock.
    ServerTimestamp,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_envelope(&self) -> Option<&Envelope> {
        match self {
            Value::Envelope(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Ordering used by collection queries.
    ///
    /// Timestamps and strings compare naturally; values of different or
    /// unordered types compare equal.
    pub(crate) fn query_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Envelope> for Value {
    fn from(e: Envelope) -> Self {
        Value::Envelope(e)
    }
}

/// A stored document as returned by reads and subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Last path segment.
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Look up an attribute, treating `Null` as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_get_skips_null() {
        let mut fields = Fields::new();
        fields.insert("a".into(), Value::Null);
        fields.insert("b".into(), Value::from("x"));
        let doc = Document {
            id: "d".into(),
            fields,
        };
        assert!(doc.get("a").is_none());
        assert_eq!(doc.get("b").and_then(Value::as_str), Some("x"));
        assert!(doc.get("missing").is_none());
    }

    #[test]
    fn values_serialize_with_type_tags() {
        let json = serde_json::to_value(Value::Bytes(vec![1, 2, 3])).unwrap();
        assert_eq!(json, serde_json::json!({ "bytes": "AQID" }));

        let json = serde_json::to_value(Value::from("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "string": "hi" }));

        let back: Value = serde_json::from_value(serde_json::json!("null")).unwrap();
        assert!(back.is_null());
    }

    #[test]
    fn query_cmp_orders_timestamps() {
        let early = Value::Timestamp(DateTime::from_timestamp(10, 0).unwrap());
        let late = Value::Timestamp(DateTime::from_timestamp(20, 0).unwrap());
        assert_eq!(early.query_cmp(&late), Ordering::Less);
        assert_eq!(late.query_cmp(&early), Ordering::Greater);
        assert_eq!(early.query_cmp(&Value::Null), Ordering::Equal);
    }
}
