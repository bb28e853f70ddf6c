//! `passvault setup`: create the vault with a new master passphrase.

use crate::cli::output;
use crate::cli::{prompt_new_passphrase, Context};
use crate::errors::{Result, VaultError};

/// Execute the `setup` command.
pub async fn execute(ctx: &Context) -> Result<()> {
    let session = ctx.session();

    // 1. Refuse early, before asking for a passphrase.
    if session.has_vault().await? {
        output::tip("Use `passvault list <kind>` to open the existing vault.");
        return Err(VaultError::AlreadyInitialized);
    }

    // 2. Prompt for the new passphrase (with confirmation).
    let passphrase = prompt_new_passphrase(ctx.settings.min_passphrase_length)?;

    // 3. Derive the key and write the master key record.
    session.setup(&passphrase).await?;
    session.lock();

    output::success(&format!(
        "Vault created for '{}' in {}",
        ctx.identity.id,
        ctx.store_path.display()
    ));
    output::warning("The master passphrase cannot be recovered. Keep it safe.");
    output::tip("Run `passvault add credential --site <SITE>` to add a login.");

    Ok(())
}
