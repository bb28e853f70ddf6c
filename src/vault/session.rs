//! The per-identity vault session.
//!
//! A `VaultSession` is the only owner of the live key.  Its state is
//! published on a `watch` channel so that subscriptions (and any UI) can
//! observe lock transitions and stop using a key the moment it is
//! withdrawn.
//!
//! ```text
//!   SetupRequired --setup--> Unlocked
//!   Locked --unlock--> Unlocking --ok--> Unlocked
//!                                 --err--> Locked
//!   any --lock--> Locked
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use super::identity::Identity;
use super::unlock::UnlockProtocol;
use crate::crypto::{decrypt_field, encrypt_field, Envelope, SymmetricKey};
use crate::errors::{Result, VaultError};

/// Lock state of a session.
#[derive(Debug, Clone)]
pub enum VaultSessionState {
    /// A vault exists (or has not been checked yet) and no key is held.
    Locked,
    /// An unlock or setup is deriving the key.
    Unlocking,
    /// The key is live.
    Unlocked(Arc<SymmetricKey>),
    /// The identity has no vault yet.
    SetupRequired,
}

impl VaultSessionState {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, VaultSessionState::Unlocked(_))
    }

    /// Short label for logs and status output.
    pub fn label(&self) -> &'static str {
        match self {
            VaultSessionState::Locked => "locked",
            VaultSessionState::Unlocking => "unlocking",
            VaultSessionState::Unlocked(_) => "unlocked",
            VaultSessionState::SetupRequired => "setup-required",
        }
    }
}

/// Vault state for one signed-in identity.
pub struct VaultSession {
    identity: Identity,
    protocol: UnlockProtocol,
    state: watch::Sender<VaultSessionState>,
    /// Bumped by every `lock`, so an unlock that finishes after a lock
    /// can tell it lost the race.
    generation: AtomicU64,
    /// Held across `setup` and `unlock` so they never overlap.
    transition: Mutex<()>,
}

impl VaultSession {
    /// Start a locked session for `identity`.
    pub fn new(identity: Identity, protocol: UnlockProtocol) -> Self {
        let (state, _) = watch::channel(VaultSessionState::Locked);
        Self {
            identity,
            protocol,
            state,
            generation: AtomicU64::new(0),
            transition: Mutex::new(()),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Current state (the key, if any, is shared, not copied).
    pub fn state(&self) -> VaultSessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state transition.
    pub fn watch(&self) -> watch::Receiver<VaultSessionState> {
        self.state.subscribe()
    }

    pub fn is_unlocked(&self) -> bool {
        self.state.borrow().is_unlocked()
    }

    /// The live key, captured for one operation.
    ///
    /// Fails with `VaultError::Locked` unless the session is unlocked.
    pub fn key(&self) -> Result<Arc<SymmetricKey>> {
        match &*self.state.borrow() {
            VaultSessionState::Unlocked(key) => Ok(Arc::clone(key)),
            _ => Err(VaultError::Locked),
        }
    }

    /// Check the store for a master key record.
    ///
    /// While no key is held, this also settles the state between
    /// `Locked` and `SetupRequired`.
    pub async fn has_vault(&self) -> Result<bool> {
        let exists = self.protocol.has_vault(&self.identity).await?;
        self.state.send_if_modified(|state| {
            let next = match state {
                VaultSessionState::Locked if !exists => VaultSessionState::SetupRequired,
                VaultSessionState::SetupRequired if exists => VaultSessionState::Locked,
                _ => return false,
            };
            *state = next;
            true
        });
        Ok(exists)
    }

    /// Create the vault and leave the session unlocked.
    pub async fn setup(&self, passphrase: &str) -> Result<()> {
        let _transition = self.transition.lock().await;
        if self.is_unlocked() {
            return Err(VaultError::AlreadyInitialized);
        }
        let previous = self.state();
        let generation = self.begin_unlocking();

        match self.protocol.setup(&self.identity, passphrase).await {
            Ok(key) => self.finish_unlocking(generation, key),
            Err(e) => {
                let fallback = match e {
                    VaultError::AlreadyInitialized => VaultSessionState::Locked,
                    _ => previous,
                };
                self.abort_unlocking(generation, fallback);
                Err(e)
            }
        }
    }

    /// Verify `passphrase` and unlock.
    ///
    /// On failure the session returns to `Locked` and the error is
    /// `InvalidPassphrase` (or a store error, propagated unchanged).
    /// If the session is already unlocked the passphrase is still
    /// verified; the live key is kept either way.
    pub async fn unlock(&self, passphrase: &str) -> Result<()> {
        let _transition = self.transition.lock().await;
        if self.is_unlocked() {
            return self.protocol.unlock(&self.identity, passphrase).await.map(drop);
        }
        let generation = self.begin_unlocking();

        match self.protocol.unlock(&self.identity, passphrase).await {
            Ok(key) => self.finish_unlocking(generation, key),
            Err(e) => {
                self.abort_unlocking(generation, VaultSessionState::Locked);
                Err(e)
            }
        }
    }

    /// Drop the key.  Idempotent, valid from any state.
    pub fn lock(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let previous = self.state.send_replace(VaultSessionState::Locked);
        if previous.is_unlocked() {
            info!(identity = %self.identity.id, "vault locked");
        }
    }

    /// Called when the owning identity signs out: lock before the
    /// identity's credentials go away.
    pub fn sign_out(&self) {
        self.lock();
        debug!(identity = %self.identity.id, "session signed out");
    }

    /// Encrypt with the live key.  Refused while locked.
    pub fn encrypt_field(&self, plaintext: &str) -> Result<Envelope> {
        encrypt_field(plaintext, &*self.key()?)
    }

    /// Decrypt with the live key.  Refused while locked.
    pub fn decrypt_field(&self, envelope: &Envelope) -> Result<String> {
        decrypt_field(envelope, &*self.key()?)
    }

    fn begin_unlocking(&self) -> u64 {
        let generation = self.generation.load(Ordering::SeqCst);
        self.state.send_replace(VaultSessionState::Unlocking);
        generation
    }

    fn finish_unlocking(&self, generation: u64, key: SymmetricKey) -> Result<()> {
        let key = Arc::new(key);
        let installed = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = VaultSessionState::Unlocked(Arc::clone(&key));
            true
        });
        if installed {
            Ok(())
        } else {
            debug!(identity = %self.identity.id, "unlock finished after lock, key discarded");
            Err(VaultError::Locked)
        }
    }

    fn abort_unlocking(&self, generation: u64, fallback: VaultSessionState) {
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = fallback;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn session() -> VaultSession {
        let store = Arc::new(MemoryStore::new());
        VaultSession::new(Identity::new("u1", "U"), UnlockProtocol::new(store))
    }

    #[tokio::test]
    async fn has_vault_moves_between_locked_and_setup_required() {
        let s = session();
        assert!(matches!(s.state(), VaultSessionState::Locked));
        assert!(!s.has_vault().await.unwrap());
        assert!(matches!(s.state(), VaultSessionState::SetupRequired));

        s.setup("correct-horse-1").await.unwrap();
        assert!(s.is_unlocked());
        s.lock();
        assert!(s.has_vault().await.unwrap());
        assert!(matches!(s.state(), VaultSessionState::Locked));
    }

    #[tokio::test]
    async fn lock_is_idempotent_from_any_state() {
        let s = session();
        s.lock();
        s.lock();
        assert!(matches!(s.state(), VaultSessionState::Locked));
        assert!(matches!(s.key(), Err(VaultError::Locked)));
    }

    #[tokio::test]
    async fn failed_unlock_returns_to_locked() {
        let s = session();
        s.setup("correct-horse-1").await.unwrap();
        s.lock();

        let err = s.unlock("wrong-horse-1").await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidPassphrase));
        assert!(matches!(s.state(), VaultSessionState::Locked));
    }

    #[tokio::test]
    async fn weak_setup_restores_previous_state() {
        let s = session();
        s.has_vault().await.unwrap();
        assert!(matches!(
            s.setup("short").await,
            Err(VaultError::WeakPassphrase(_))
        ));
        assert!(matches!(s.state(), VaultSessionState::SetupRequired));
    }

    #[tokio::test]
    async fn decrypt_is_refused_after_lock() {
        let s = session();
        s.setup("correct-horse-1").await.unwrap();
        let env = s.encrypt_field("hello").unwrap();
        assert_eq!(s.decrypt_field(&env).unwrap(), "hello");

        s.lock();
        assert!(matches!(s.decrypt_field(&env), Err(VaultError::Locked)));
        assert!(matches!(s.encrypt_field("x"), Err(VaultError::Locked)));
    }

    #[tokio::test]
    async fn lock_during_unlock_wins() {
        let s = Arc::new(session());
        s.setup("correct-horse-1").await.unwrap();
        s.lock();

        let mut states = s.watch();
        let unlocking = {
            let s = Arc::clone(&s);
            tokio::spawn(async move { s.unlock("correct-horse-1").await })
        };

        // Wait until the unlock is in flight, then lock underneath it.
        states
            .wait_for(|st| matches!(st, VaultSessionState::Unlocking))
            .await
            .unwrap();
        s.lock();

        let result = unlocking.await.unwrap();
        assert!(matches!(result, Err(VaultError::Locked)));
        assert!(!s.is_unlocked());
    }

    #[tokio::test]
    async fn wrong_passphrase_fails_even_while_unlocked() {
        let s = session();
        s.setup("correct-horse-1").await.unwrap();
        let key = s.key().unwrap();

        assert!(matches!(
            s.unlock("definitely-wrong").await,
            Err(VaultError::InvalidPassphrase)
        ));
        // The live key is untouched.
        assert!(Arc::ptr_eq(&key, &s.key().unwrap()));

        s.unlock("correct-horse-1").await.unwrap();
        assert!(Arc::ptr_eq(&key, &s.key().unwrap()));
    }

    #[tokio::test]
    async fn concurrent_setups_on_one_session_succeed_once() {
        let s = session();
        let (a, b) = tokio::join!(s.setup("passphrase-A-1"), s.setup("passphrase-B-1"));
        let a_won = a.is_ok();

        assert_ne!(a.is_ok(), b.is_ok());
        assert!(matches!(
            a.err().or(b.err()),
            Some(VaultError::AlreadyInitialized)
        ));

        // Only the winning passphrase opens the vault.
        s.lock();
        let a_opens = s.unlock("passphrase-A-1").await.is_ok();
        s.lock();
        let b_opens = s.unlock("passphrase-B-1").await.is_ok();
        assert_eq!(a_opens, a_won);
        assert_eq!(b_opens, !a_won);
    }

    #[test]
    fn state_labels() {
        assert_eq!(VaultSessionState::Locked.label(), "locked");
        assert_eq!(VaultSessionState::SetupRequired.label(), "setup-required");
    }
}
