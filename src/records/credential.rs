use super::{non_empty, RecordKind};
use crate::errors::Result;
use crate::sync::{AttributeSpec, DecryptedView, RecordFields, RecordSchema};

/// Category applied when none is given.
pub const DEFAULT_CATEGORY: &str = "personal";

pub const CREDENTIAL_SCHEMA: RecordSchema = RecordSchema {
    kind: "credential",
    collection: "passwords",
    attributes: &[
        AttributeSpec::plaintext("site"),
        AttributeSpec::plaintext("url").optional(),
        AttributeSpec::plaintext("category").with_default(DEFAULT_CATEGORY),
        AttributeSpec::encrypted("username"),
        AttributeSpec::encrypted("password"),
    ],
};

/// A site login.  `username` and `password` are encrypted at rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub site: String,
    pub url: Option<String>,
    pub category: String,
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(
        site: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            url: None,
            category: DEFAULT_CATEGORY.to_string(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl RecordKind for Credential {
    const SCHEMA: &'static RecordSchema = &CREDENTIAL_SCHEMA;

    fn to_fields(&self) -> Result<RecordFields> {
        let mut fields = RecordFields::new();
        fields.insert("site".into(), self.site.clone());
        if let Some(url) = &self.url {
            fields.insert("url".into(), url.clone());
        }
        fields.insert("category".into(), self.category.clone());
        fields.insert("username".into(), self.username.clone());
        fields.insert("password".into(), self.password.clone());
        Ok(fields)
    }

    fn from_view(view: &DecryptedView) -> Result<Self> {
        Ok(Self {
            site: view.get("site").to_string(),
            url: non_empty(view.get("url")),
            category: view.get("category").to_string(),
            username: view.get("username").to_string(),
            password: view.get("password").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_encrypted_attributes() {
        let names: Vec<_> = CREDENTIAL_SCHEMA.encrypted_attributes().collect();
        assert_eq!(names, ["username", "password"]);
    }

    #[test]
    fn missing_url_is_left_out() {
        let fields = Credential::new("github", "ana", "pw").to_fields().unwrap();
        assert!(!fields.contains_key("url"));
        assert_eq!(fields["category"], "personal");
    }
}
