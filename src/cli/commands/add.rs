//! `passvault add`: encrypt and store a new record.

use crate::cli::output;
use crate::cli::{parse_assignment, prompt_secret, prompt_text, AddRecord, Context};
use crate::errors::Result;
use crate::records::{Contact, Credential, FieldEntry, Kind, PersonalRecord, RecordKind};

/// Execute the `add` command.
pub async fn execute(ctx: &Context, record: &AddRecord) -> Result<()> {
    // Collect every attribute before touching the vault, so a failed
    // unlock is the last thing that can go wrong.
    let (kind, fields) = match record {
        AddRecord::Credential {
            site,
            url,
            category,
            username,
        } => {
            let username = match username {
                Some(u) => u.clone(),
                None => prompt_text("Username")?,
            };
            let password = prompt_secret(&format!("Password for {site}"))?;
            let mut credential = Credential::new(site.as_str(), username, password);
            credential.url = url.clone().filter(|u| !u.is_empty());
            if let Some(category) = category {
                credential.category = category.clone();
            }
            (Kind::Credential, credential.to_fields()?)
        }

        AddRecord::Contact {
            name,
            category,
            phone,
            email,
            notes,
        } => {
            let phone = match phone {
                Some(p) => p.clone(),
                None => prompt_secret(&format!("Phone for {name}"))?,
            };
            let mut contact = Contact::new(name.as_str(), phone);
            contact.email = email.clone();
            contact.notes = notes.clone();
            if let Some(category) = category {
                contact.category = category.clone();
            }
            (Kind::Contact, contact.to_fields()?)
        }

        AddRecord::Person {
            name,
            nickname,
            fields,
        } => {
            let mut person = PersonalRecord::new(name.as_str());
            person.nickname = nickname.clone().unwrap_or_default();
            person.fields = parse_field_entries(fields)?;
            (Kind::Person, person.to_fields()?)
        }
    };

    let session = ctx.unlock().await?;
    let id = ctx.synchronizer(kind).create(&session, &fields).await?;
    session.lock();

    output::success(&format!("Added {kind} {id}"));
    output::tip(&format!("Run `passvault show {kind} {id}` to view it."));

    Ok(())
}

/// Parse repeated `KEY=VALUE` arguments into field entries.
pub(crate) fn parse_field_entries(args: &[String]) -> Result<Vec<FieldEntry>> {
    args.iter()
        .map(|arg| parse_assignment(arg).map(|(key, value)| FieldEntry::new(key, value)))
        .collect()
}
