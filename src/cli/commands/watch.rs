//! `passvault watch`: print every pushed snapshot until Ctrl-C.

use console::style;

use crate::cli::output;
use crate::cli::Context;
use crate::errors::Result;
use crate::records::Kind;

/// Execute the `watch` command.
pub async fn execute(ctx: &Context, kind: Kind) -> Result<()> {
    let session = ctx.unlock().await?;
    let mut subscription = ctx.synchronizer(kind).subscribe(&session).await?;

    output::info(&format!("Watching {kind} records. Press Ctrl-C to stop."));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = subscription.next() => match next {
                Some(Ok(snapshot)) => {
                    println!(
                        "{}",
                        style(format!("#{} ({} record(s))", snapshot.sequence, snapshot.len())).bold()
                    );
                    output::print_snapshot(kind, &snapshot)?;
                }
                Some(Err(e)) => {
                    session.lock();
                    return Err(e);
                }
                None => break,
            },
        }
    }

    // Lock first: the subscription observes it and stops on its own.
    session.lock();
    subscription.cancel();
    output::info("Stopped.");

    Ok(())
}
