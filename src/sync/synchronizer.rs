use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::projection::{decode_document, encode_fields, DecryptedView, RecordFields, RecordId, WriteMode};
use super::schema::{RecordSchema, CREATED_AT};
use super::subscription::{Subscription, SubscriptionWorker};
use crate::config::{DecryptFailurePolicy, Settings};
use crate::errors::Result;
use crate::store::{collection_path, document_path, DocumentStore};
use crate::vault::{Identity, VaultSession};

/// Default number of snapshots buffered per subscription.
pub const DEFAULT_SNAPSHOT_BUFFER: usize = 16;

/// Keeps one record kind's collection in sync for a vault session.
///
/// The synchronizer holds no key.  Every operation that encrypts or
/// decrypts takes the `VaultSession` and captures its live key for the
/// duration of that call, so a locked session refuses with
/// `VaultError::Locked`.
#[derive(Clone)]
pub struct CollectionSynchronizer {
    store: Arc<dyn DocumentStore>,
    schema: &'static RecordSchema,
    snapshot_buffer: usize,
    failure_policy: DecryptFailurePolicy,
}

impl CollectionSynchronizer {
    pub fn new(store: Arc<dyn DocumentStore>, schema: &'static RecordSchema) -> Self {
        Self {
            store,
            schema,
            snapshot_buffer: DEFAULT_SNAPSHOT_BUFFER,
            failure_policy: DecryptFailurePolicy::default(),
        }
    }

    /// Take the buffer size and failure policy from `settings`.
    pub fn with_settings(
        store: Arc<dyn DocumentStore>,
        schema: &'static RecordSchema,
        settings: &Settings,
    ) -> Self {
        Self::new(store, schema)
            .with_snapshot_buffer(settings.snapshot_buffer)
            .with_failure_policy(settings.decrypt_failure)
    }

    pub fn with_failure_policy(mut self, policy: DecryptFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_snapshot_buffer(mut self, buffer: usize) -> Self {
        self.snapshot_buffer = buffer.max(1);
        self
    }

    pub fn schema(&self) -> &'static RecordSchema {
        self.schema
    }

    fn collection(&self, identity: &Identity) -> String {
        collection_path(&identity.id, self.schema.collection)
    }

    /// Start a live subscription, newest record first.
    ///
    /// The first snapshot reflects the collection at subscribe time.
    pub async fn subscribe(&self, session: &VaultSession) -> Result<Subscription> {
        let key = session.key()?;
        let state = session.watch();
        let collection = self.collection(session.identity());

        let remote = self.store.subscribe(&collection, CREATED_AT, true).await?;
        info!(kind = self.schema.kind, identity = %session.identity().id, "subscribed");

        let worker = SubscriptionWorker {
            schema: self.schema,
            collection,
            remote,
            session: state,
            key,
            policy: self.failure_policy,
        };
        Ok(Subscription::spawn(worker, self.snapshot_buffer))
    }

    /// Encrypt and store a new record.  Returns its id.
    pub async fn create(&self, session: &VaultSession, fields: &RecordFields) -> Result<RecordId> {
        let key = session.key()?;
        let doc = encode_fields(self.schema, fields, &key, WriteMode::Create)?;
        drop(key);

        let id = Uuid::new_v4().to_string();
        let path = document_path(&self.collection(session.identity()), &id);
        self.store.put_document(&path, doc).await?;

        debug!(kind = self.schema.kind, record = %id, "record created");
        Ok(id)
    }

    /// Overwrite every attribute of an existing record.
    ///
    /// Fails with the store's `NotFound` if the record does not exist.
    pub async fn update(
        &self,
        session: &VaultSession,
        id: &str,
        fields: &RecordFields,
    ) -> Result<()> {
        let key = session.key()?;
        let doc = encode_fields(self.schema, fields, &key, WriteMode::Update)?;
        drop(key);

        let path = document_path(&self.collection(session.identity()), id);
        self.store.update_fields(&path, doc).await?;

        debug!(kind = self.schema.kind, record = %id, "record updated");
        Ok(())
    }

    /// Delete a record.  Removing a missing record succeeds.
    pub async fn remove(&self, identity: &Identity, id: &str) -> Result<()> {
        let path = document_path(&self.collection(identity), id);
        self.store.delete_document(&path).await?;
        debug!(kind = self.schema.kind, record = %id, "record removed");
        Ok(())
    }

    /// Read and decrypt a single record.  `Ok(None)` if it does not exist.
    pub async fn fetch(&self, session: &VaultSession, id: &str) -> Result<Option<DecryptedView>> {
        let key = session.key()?;
        let path = document_path(&self.collection(session.identity()), id);
        match self.store.get_document(&path).await? {
            Some(doc) => decode_document(self.schema, &doc, &key).map(Some),
            None => Ok(None),
        }
    }
}
