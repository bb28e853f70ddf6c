//! `passvault status`: show the identity and whether its vault exists.

use crate::cli::output;
use crate::cli::Context;
use crate::errors::Result;

/// Execute the `status` command.
pub async fn execute(ctx: &Context) -> Result<()> {
    let session = ctx.session();
    let has_vault = session.has_vault().await?;

    output::info(&format!(
        "Identity: {} ({})",
        ctx.identity.display_name, ctx.identity.id
    ));
    output::info(&format!("Store: {}", ctx.store_path.display()));

    if has_vault {
        output::success("Vault is set up (locked)");
    } else {
        output::warning("No vault set up for this identity");
        output::tip("Run `passvault setup` to create one.");
    }

    Ok(())
}
