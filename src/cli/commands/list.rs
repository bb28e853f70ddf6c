//! `passvault list`: decrypt and display one collection.

use crate::cli::output;
use crate::cli::Context;
use crate::errors::{Result, VaultError};
use crate::records::Kind;

/// Execute the `list` command.
pub async fn execute(ctx: &Context, kind: Kind) -> Result<()> {
    let session = ctx.unlock().await?;

    // The first snapshot of a subscription is the collection as it is now.
    let mut subscription = ctx.synchronizer(kind).subscribe(&session).await?;
    let snapshot = subscription.next().await.ok_or_else(|| {
        VaultError::CommandFailed("subscription ended before the first snapshot".into())
    })??;
    subscription.cancel();
    session.lock();

    output::info(&format!("{} {kind} record(s)", snapshot.len()));
    output::print_snapshot(kind, &snapshot)?;

    Ok(())
}
