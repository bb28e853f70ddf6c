//! `passvault remove`: delete a record.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::Context;
use crate::errors::{Result, VaultError};
use crate::records::Kind;

/// Execute the `remove` command.
///
/// Deleting needs no key, so the vault is not unlocked.
pub async fn execute(ctx: &Context, kind: Kind, id: &str, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove {kind} '{id}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    ctx.synchronizer(kind).remove(&ctx.identity, id).await?;
    output::success(&format!("Removed {kind} '{id}'"));

    Ok(())
}
