//! Integration tests for the PassVault vault module: setup, unlock,
//! lock, and identity tracking.

use std::sync::Arc;
use std::time::Duration;

use passvault::crypto::{decrypt_field, encrypt_field};
use passvault::errors::VaultError;
use passvault::store::{user_path, DocumentStore, MemoryStore};
use passvault::vault::{
    track_identity, Identity, IdentityProvider, MasterKeyRecord, StaticIdentityProvider,
    UnlockProtocol, VaultSession, VaultSessionState,
};

const PASSPHRASE: &str = "correct horse battery";

fn setup_store() -> (MemoryStore, UnlockProtocol) {
    let store = MemoryStore::new();
    let protocol = UnlockProtocol::new(Arc::new(store.clone()));
    (store, protocol)
}

fn ana() -> Identity {
    Identity::new("ana-uid", "Ana")
}

// ---------------------------------------------------------------------------
// Unlock protocol
// ---------------------------------------------------------------------------

#[tokio::test]
async fn setup_then_unlock_yields_equivalent_key() {
    let (_store, protocol) = setup_store();
    let who = ana();

    assert!(!protocol.has_vault(&who).await.unwrap());
    let setup_key = protocol.setup(&who, PASSPHRASE).await.unwrap();
    assert!(protocol.has_vault(&who).await.unwrap());

    let unlock_key = protocol.unlock(&who, PASSPHRASE).await.unwrap();

    let env = encrypt_field("probe", &setup_key).unwrap();
    assert_eq!(decrypt_field(&env, &unlock_key).unwrap(), "probe");
}

#[tokio::test]
async fn wrong_passphrases_are_all_invalid() {
    let (_store, protocol) = setup_store();
    let who = ana();
    protocol.setup(&who, PASSPHRASE).await.unwrap();

    for wrong in ["", "correct horse batterY", "correct horse batter", "x"] {
        let err = protocol.unlock(&who, wrong).await.unwrap_err();
        assert!(
            matches!(err, VaultError::InvalidPassphrase),
            "{wrong:?} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn second_setup_fails_and_leaves_record_unchanged() {
    let (store, protocol) = setup_store();
    let who = ana();
    protocol.setup(&who, PASSPHRASE).await.unwrap();

    let before = store.get_document(&user_path(&who.id)).await.unwrap().unwrap();
    let err = protocol.setup(&who, "another passphrase").await.unwrap_err();
    assert!(matches!(err, VaultError::AlreadyInitialized));

    let after = store.get_document(&user_path(&who.id)).await.unwrap().unwrap();
    assert_eq!(before, after);

    // The original passphrase still unlocks.
    protocol.unlock(&who, PASSPHRASE).await.unwrap();
}

#[tokio::test]
async fn record_holds_salt_and_verifier_but_no_key() {
    let (store, protocol) = setup_store();
    let who = ana();
    protocol.setup(&who, PASSPHRASE).await.unwrap();

    let doc = store.get_document(&user_path(&who.id)).await.unwrap().unwrap();
    let record = MasterKeyRecord::from_document(&doc).expect("record present");
    assert_eq!(record.verifier.iv.len(), 12);

    let json = serde_json::to_string(&store.dump().await).unwrap();
    assert!(!json.contains(PASSPHRASE));
    assert!(!json.contains("vault-verifier"));
}

#[tokio::test]
async fn identities_have_independent_vaults() {
    let (_store, protocol) = setup_store();
    let bob = Identity::new("bob-uid", "Bob");
    protocol.setup(&ana(), PASSPHRASE).await.unwrap();

    assert!(!protocol.has_vault(&bob).await.unwrap());
    assert!(matches!(
        protocol.unlock(&bob, PASSPHRASE).await,
        Err(VaultError::InvalidPassphrase)
    ));
}

// ---------------------------------------------------------------------------
// End-to-end scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn setup_wrong_unlock_right_unlock_cross_key_scenario() {
    let (_store, protocol) = setup_store();
    let session = VaultSession::new(ana(), protocol.clone());

    assert!(!session.has_vault().await.unwrap());
    assert!(matches!(session.state(), VaultSessionState::SetupRequired));

    session.setup(PASSPHRASE).await.unwrap();
    let env = session.encrypt_field("my bank pin").unwrap();
    session.lock();

    assert!(matches!(
        session.unlock("not the passphrase").await,
        Err(VaultError::InvalidPassphrase)
    ));
    assert!(!session.is_unlocked());

    session.unlock(PASSPHRASE).await.unwrap();
    assert_eq!(session.decrypt_field(&env).unwrap(), "my bank pin");

    // A key derived for another identity cannot read it.
    let bob = Identity::new("bob-uid", "Bob");
    let bob_key = protocol.setup(&bob, PASSPHRASE).await.unwrap();
    assert!(matches!(
        decrypt_field(&env, &bob_key),
        Err(VaultError::Authentication)
    ));
}

#[tokio::test]
async fn decrypt_through_session_is_refused_after_lock() {
    let (_store, protocol) = setup_store();
    let session = VaultSession::new(ana(), protocol);
    session.setup(PASSPHRASE).await.unwrap();
    let env = session.encrypt_field("x").unwrap();

    session.lock();
    session.lock();
    assert!(matches!(session.decrypt_field(&env), Err(VaultError::Locked)));
    assert!(matches!(session.key(), Err(VaultError::Locked)));
}

#[tokio::test]
async fn unlock_while_unlocked_still_checks_the_passphrase() {
    let (_store, protocol) = setup_store();
    let session = VaultSession::new(ana(), protocol);
    session.setup(PASSPHRASE).await.unwrap();
    let key = session.key().unwrap();

    assert!(matches!(
        session.unlock("wrong").await,
        Err(VaultError::InvalidPassphrase)
    ));
    // A failed re-check does not disturb the live key.
    assert!(session.is_unlocked());
    assert!(Arc::ptr_eq(&key, &session.key().unwrap()));

    session.unlock(PASSPHRASE).await.unwrap();
    assert!(Arc::ptr_eq(&key, &session.key().unwrap()));
}

#[tokio::test]
async fn overlapping_unlocks_are_serialized() {
    let (_store, protocol) = setup_store();
    let session = VaultSession::new(ana(), protocol);
    session.setup(PASSPHRASE).await.unwrap();
    session.lock();

    let (a, b) = tokio::join!(session.unlock(PASSPHRASE), session.unlock("wrong"));
    a.unwrap();
    assert!(matches!(b, Err(VaultError::InvalidPassphrase)));
    assert!(session.is_unlocked());
}

// ---------------------------------------------------------------------------
// Identity tracking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sign_out_locks_the_session() {
    let (_store, protocol) = setup_store();
    let provider = StaticIdentityProvider::new(Some(ana()));
    let session = Arc::new(VaultSession::new(ana(), protocol));
    session.setup(PASSPHRASE).await.unwrap();

    let tracker = track_identity(Arc::clone(&session), provider.changes());
    assert!(session.is_unlocked());

    provider.sign_out();
    tokio::time::timeout(Duration::from_secs(5), tracker)
        .await
        .expect("tracker finishes")
        .unwrap();
    assert!(matches!(session.state(), VaultSessionState::Locked));
    assert_eq!(provider.current_identity(), None);
}

#[tokio::test]
async fn switching_identity_locks_the_session() {
    let (_store, protocol) = setup_store();
    let provider = StaticIdentityProvider::new(Some(ana()));
    let session = Arc::new(VaultSession::new(ana(), protocol));
    session.setup(PASSPHRASE).await.unwrap();

    let tracker = track_identity(Arc::clone(&session), provider.changes());
    provider.sign_in(Identity::new("bob-uid", "Bob"));

    tokio::time::timeout(Duration::from_secs(5), tracker)
        .await
        .expect("tracker finishes")
        .unwrap();
    assert!(!session.is_unlocked());
}
