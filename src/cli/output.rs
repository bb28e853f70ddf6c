//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::errors::Result;
use crate::records::{Contact, Credential, Kind, PersonalRecord, RecordKind, Stored};
use crate::sync::{DecryptedView, Snapshot};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Mask a secret for table display.
fn mask(secret: &str) -> String {
    "\u{2022}".repeat(secret.chars().count().clamp(4, 12))
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// Print a snapshot as a table of the given kind.
///
/// Secrets are masked; use `show` to reveal one record.
pub fn print_snapshot(kind: Kind, snapshot: &Snapshot) -> Result<()> {
    if snapshot.is_empty() {
        info(&format!("No {kind} records yet."));
        tip(&format!("Run `passvault add {kind}` to add one."));
    } else {
        let table = match kind {
            Kind::Credential => credential_table(&decode::<Credential>(snapshot)?),
            Kind::Contact => contact_table(&decode::<Contact>(snapshot)?),
            Kind::Person => person_table(&decode::<PersonalRecord>(snapshot)?),
        };
        println!("{table}");
    }

    if !snapshot.undecryptable.is_empty() {
        warning(&format!(
            "{} record(s) could not be decrypted: {}",
            snapshot.undecryptable.len(),
            snapshot.undecryptable.join(", ")
        ));
    }
    Ok(())
}

fn decode<T: RecordKind>(snapshot: &Snapshot) -> Result<Vec<Stored<T>>> {
    crate::records::decode_snapshot(snapshot)
}

fn credential_table(records: &[Stored<Credential>]) -> Table {
    let mut table = new_table(vec!["Id", "Site", "Category", "Username", "Password", "Created"]);
    for r in records {
        table.add_row(vec![
            r.id.clone(),
            r.record.site.clone(),
            r.record.category.clone(),
            r.record.username.clone(),
            mask(&r.record.password),
            format_time(r.created_at),
        ]);
    }
    table
}

fn contact_table(records: &[Stored<Contact>]) -> Table {
    let mut table = new_table(vec!["Id", "Name", "Category", "Phone", "Email", "Created"]);
    for r in records {
        table.add_row(vec![
            r.id.clone(),
            r.record.name.clone(),
            r.record.category.clone(),
            r.record.phone.clone(),
            r.record.email.clone().unwrap_or_default(),
            format_time(r.created_at),
        ]);
    }
    table
}

fn person_table(records: &[Stored<PersonalRecord>]) -> Table {
    let mut table = new_table(vec!["Id", "Name", "Nickname", "Fields", "Created"]);
    for r in records {
        let keys: Vec<&str> = r.record.fields.iter().map(|f| f.key.as_str()).collect();
        table.add_row(vec![
            r.id.clone(),
            r.record.name.clone(),
            r.record.nickname.clone(),
            keys.join(", "),
            format_time(r.created_at),
        ]);
    }
    table
}

/// Print one decrypted record as an attribute/value table.
pub fn print_record(kind: Kind, view: &DecryptedView) -> Result<()> {
    let mut table = new_table(vec!["Attribute", "Value"]);
    table.add_row(vec!["id".to_string(), view.id.clone()]);

    if kind == Kind::Person {
        let person = PersonalRecord::from_view(view)?;
        table.add_row(vec!["name".to_string(), person.name]);
        table.add_row(vec!["nickname".to_string(), person.nickname]);
        for field in person.fields {
            table.add_row(vec![format!("  {}", field.key), field.value]);
        }
    } else {
        for spec in kind.schema().attributes {
            table.add_row(vec![spec.name.to_string(), view.get(spec.name).to_string()]);
        }
    }

    table.add_row(vec!["created".to_string(), format_time(view.created_at)]);
    table.add_row(vec!["updated".to_string(), format_time(view.updated_at)]);
    println!("{table}");
    Ok(())
}
