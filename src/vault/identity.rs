//! Signed-in identity, as reported by the external identity provider.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use super::session::VaultSession;

/// The authenticated user the vault belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }
}

/// Source of the current identity and of sign-in / sign-out notifications.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    /// Receiver that observes every identity change.
    fn changes(&self) -> watch::Receiver<Option<Identity>>;
}

/// An identity provider driven by explicit `sign_in` / `sign_out` calls.
pub struct StaticIdentityProvider {
    current: watch::Sender<Option<Identity>>,
}

impl StaticIdentityProvider {
    pub fn new(initial: Option<Identity>) -> Self {
        let (current, _) = watch::channel(initial);
        Self { current }
    }

    pub fn sign_in(&self, identity: Identity) {
        self.current.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        self.current.send_replace(None);
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn changes(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}

/// Lock `session` as soon as the provider reports a different identity
/// (or none).  The task ends after locking.
pub fn track_identity(
    session: Arc<VaultSession>,
    mut changes: watch::Receiver<Option<Identity>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let owner_present = changes
                .borrow_and_update()
                .as_ref()
                .is_some_and(|current| current.id == session.identity().id);

            if !owner_present {
                info!(identity = %session.identity().id, "identity changed, locking vault");
                session.sign_out();
                return;
            }

            if changes.changed().await.is_err() {
                info!(identity = %session.identity().id, "identity provider gone, locking vault");
                session.sign_out();
                return;
            }
        }
    })
}
