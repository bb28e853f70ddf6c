//! `passvault edit`: overwrite attributes of an existing record.
//!
//! The record is decrypted first; attributes not named on the command
//! line keep their current values, then the whole record is re-encrypted.

use crate::cli::commands::add::parse_field_entries;
use crate::cli::output;
use crate::cli::{parse_assignment, Context};
use crate::errors::{Result, VaultError};
use crate::records::{Kind, PersonalRecord, RecordKind};
use crate::sync::{DecryptedView, RecordFields};

/// Execute the `edit` command.
pub async fn execute(
    ctx: &Context,
    kind: Kind,
    id: &str,
    sets: &[String],
    fields: &[String],
) -> Result<()> {
    if sets.is_empty() && fields.is_empty() {
        return Err(VaultError::CommandFailed(
            "nothing to change: pass --set NAME=VALUE or --field KEY=VALUE".into(),
        ));
    }
    if !fields.is_empty() && kind != Kind::Person {
        return Err(VaultError::CommandFailed(format!(
            "--field only applies to person records, not {kind}"
        )));
    }

    let session = ctx.unlock().await?;
    let sync = ctx.synchronizer(kind);

    let current = sync
        .fetch(&session, id)
        .await?
        .ok_or_else(|| VaultError::RecordNotFound(id.to_string()))?;

    let updated = merge_changes(kind, &current, sets, fields)?;
    sync.update(&session, id, &updated).await?;
    session.lock();

    output::success(&format!("Updated {kind} '{id}'"));
    Ok(())
}

/// Current values overlaid with the requested changes.
fn merge_changes(
    kind: Kind,
    current: &DecryptedView,
    sets: &[String],
    fields: &[String],
) -> Result<RecordFields> {
    let mut merged = if kind == Kind::Person {
        let mut person = PersonalRecord::from_view(current)?;
        if !fields.is_empty() {
            person.fields = parse_field_entries(fields)?;
        }
        person.to_fields()?
    } else {
        current.fields.clone()
    };

    let schema = kind.schema();
    for arg in sets {
        let (name, value) = parse_assignment(arg)?;
        let spec = schema.attribute(&name).ok_or_else(|| {
            VaultError::InvalidRecord(format!("{kind} has no attribute '{name}'"))
        })?;
        if spec.is_encrypted() {
            output::warning(&format!(
                "Value for '{name}' given on the command line; it may appear in shell history."
            ));
        }
        merged.insert(name, value);
    }

    Ok(merged)
}
