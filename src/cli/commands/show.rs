//! `passvault show`: decrypt and print a single record.

use crate::cli::output;
use crate::cli::Context;
use crate::errors::{Result, VaultError};
use crate::records::Kind;

/// Execute the `show` command.
pub async fn execute(ctx: &Context, kind: Kind, id: &str) -> Result<()> {
    let session = ctx.unlock().await?;
    let view = ctx.synchronizer(kind).fetch(&session, id).await?;
    session.lock();

    let view = view.ok_or_else(|| VaultError::RecordNotFound(id.to_string()))?;
    output::print_record(kind, &view)
}
