//! Declarative record schemas.
//!
//! A schema lists every attribute a record kind carries and whether it is
//! stored in the clear or as an `Envelope`.  The synchronizer is generic
//! over these tables; it never knows which kind it is serving.

/// Server-assigned creation timestamp attribute (also the sort key).
pub const CREATED_AT: &str = "createdAt";

/// Server-assigned last-modification timestamp attribute.
pub const UPDATED_AT: &str = "updatedAt";

/// How an attribute is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Readable by the store operator.
    Plaintext,
    /// Stored as an `Envelope` under the vault key.
    Encrypted,
}

/// Whether an empty value is written or left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    /// Omitted on create and cleared on update when empty.
    Optional,
}

/// One attribute of a record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub protection: Protection,
    pub presence: Presence,
    /// Substituted for an empty or missing value.
    pub default: Option<&'static str>,
}

impl AttributeSpec {
    pub const fn plaintext(name: &'static str) -> Self {
        Self {
            name,
            protection: Protection::Plaintext,
            presence: Presence::Required,
            default: None,
        }
    }

    pub const fn encrypted(name: &'static str) -> Self {
        Self {
            protection: Protection::Encrypted,
            ..Self::plaintext(name)
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            presence: Presence::Optional,
            ..self
        }
    }

    pub const fn with_default(self, default: &'static str) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.protection == Protection::Encrypted
    }

    pub fn is_optional(&self) -> bool {
        self.presence == Presence::Optional
    }
}

/// Schema of one record kind.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordSchema {
    /// Human name of the kind (`credential`, `contact`, `person`).
    pub kind: &'static str,
    /// Sub-collection under the identity's user document.
    pub collection: &'static str,
    pub attributes: &'static [AttributeSpec],
}

impl RecordSchema {
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Names of the encrypted attributes, in declaration order.
    pub fn encrypted_attributes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes
            .iter()
            .filter(|a| a.is_encrypted())
            .map(|a| a.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: RecordSchema = RecordSchema {
        kind: "sample",
        collection: "samples",
        attributes: &[
            AttributeSpec::plaintext("title"),
            AttributeSpec::plaintext("group").with_default("misc"),
            AttributeSpec::encrypted("secret"),
            AttributeSpec::encrypted("memo").optional(),
        ],
    };

    #[test]
    fn builders_compose() {
        let memo = SAMPLE.attribute("memo").unwrap();
        assert!(memo.is_encrypted());
        assert!(memo.is_optional());
        assert_eq!(memo.default, None);

        let group = SAMPLE.attribute("group").unwrap();
        assert!(!group.is_encrypted());
        assert_eq!(group.default, Some("misc"));
        assert!(SAMPLE.attribute("nope").is_none());
    }

    #[test]
    fn encrypted_attributes_in_order() {
        let names: Vec<_> = SAMPLE.encrypted_attributes().collect();
        assert_eq!(names, ["secret", "memo"]);
    }
}
