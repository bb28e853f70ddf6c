use super::{non_empty, RecordKind};
use crate::errors::Result;
use crate::sync::{AttributeSpec, DecryptedView, RecordFields, RecordSchema};

/// Category applied when none is given.
pub const DEFAULT_CATEGORY: &str = "otro";

pub const CONTACT_SCHEMA: RecordSchema = RecordSchema {
    kind: "contact",
    collection: "contacts",
    attributes: &[
        AttributeSpec::plaintext("name"),
        AttributeSpec::plaintext("category").with_default(DEFAULT_CATEGORY),
        AttributeSpec::encrypted("phone"),
        AttributeSpec::encrypted("email").optional(),
        AttributeSpec::encrypted("notes").optional(),
    ],
};

/// A person's contact details.  Everything but the name and category is
/// encrypted at rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub category: String,
    pub phone: String,
    pub email: Option<String>,
    pub notes: Option<String>,
}

impl Contact {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: DEFAULT_CATEGORY.to_string(),
            phone: phone.into(),
            email: None,
            notes: None,
        }
    }
}

impl RecordKind for Contact {
    const SCHEMA: &'static RecordSchema = &CONTACT_SCHEMA;

    fn to_fields(&self) -> Result<RecordFields> {
        let mut fields = RecordFields::new();
        fields.insert("name".into(), self.name.clone());
        fields.insert("category".into(), self.category.clone());
        fields.insert("phone".into(), self.phone.clone());
        fields.insert("email".into(), self.email.clone().unwrap_or_default());
        fields.insert("notes".into(), self.notes.clone().unwrap_or_default());
        Ok(fields)
    }

    fn from_view(view: &DecryptedView) -> Result<Self> {
        Ok(Self {
            name: view.get("name").to_string(),
            category: view.get("category").to_string(),
            phone: view.get("phone").to_string(),
            email: non_empty(view.get("email")),
            notes: non_empty(view.get("notes")),
        })
    }
}
