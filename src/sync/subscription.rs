//! Live decrypted subscriptions.
//!
//! Each subscription owns one worker task.  The worker pulls raw
//! collection snapshots from the store, decrypts them on the blocking
//! pool with the key captured at subscribe time, and pushes complete
//! `Snapshot`s over a bounded channel.  It stops as soon as the consumer
//! goes away, the session stops holding the captured key, or the store
//! stream ends.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::projection::{project_batch, Snapshot};
use super::schema::RecordSchema;
use crate::config::DecryptFailurePolicy;
use crate::crypto::SymmetricKey;
use crate::errors::{Result, VaultError};
use crate::store::{Document, SnapshotStream, StoreResult};
use crate::vault::VaultSessionState;

/// A cancelable, ordered sequence of complete decrypted snapshots.
///
/// Dropping the subscription cancels it.  Once it has ended (lock, store
/// error, cancel) it cannot be restarted; subscribe again instead.
pub struct Subscription {
    snapshots: mpsc::Receiver<Result<Snapshot>>,
    worker: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn spawn(worker: SubscriptionWorker, buffer: usize) -> Self {
        let (tx, snapshots) = mpsc::channel(buffer);
        let worker = tokio::spawn(worker.run(tx));
        Self { snapshots, worker }
    }

    /// Wait for the next snapshot.  `None` once the subscription ended.
    pub async fn next(&mut self) -> Option<Result<Snapshot>> {
        self.snapshots.recv().await
    }

    /// Stop the subscription.  No further snapshots are produced.
    pub fn cancel(mut self) {
        self.snapshots.close();
        self.worker.abort();
    }

    /// Whether the worker has stopped producing.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }
}

impl Stream for Subscription {
    type Item = Result<Snapshot>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().snapshots.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

enum Event {
    Cancelled,
    SessionChanged,
    SessionGone,
    Batch(Option<StoreResult<Vec<Document>>>),
}

/// State owned by a subscription's worker task.
pub(crate) struct SubscriptionWorker {
    pub schema: &'static RecordSchema,
    pub collection: String,
    pub remote: SnapshotStream,
    pub session: watch::Receiver<VaultSessionState>,
    pub key: Arc<SymmetricKey>,
    pub policy: DecryptFailurePolicy,
}

impl SubscriptionWorker {
    async fn run(mut self, tx: mpsc::Sender<Result<Snapshot>>) {
        let mut sequence = 0u64;
        debug!(collection = %self.collection, "subscription started");

        loop {
            let event = tokio::select! {
                biased;
                _ = tx.closed() => Event::Cancelled,
                changed = self.session.changed() => match changed {
                    Ok(()) => Event::SessionChanged,
                    Err(_) => Event::SessionGone,
                },
                batch = self.remote.next() => Event::Batch(batch),
            };

            let docs = match event {
                Event::Cancelled => {
                    debug!(collection = %self.collection, "subscription cancelled");
                    break;
                }
                Event::SessionGone => break,
                Event::SessionChanged => {
                    if self.key_is_current() {
                        continue;
                    }
                    info!(collection = %self.collection, "vault locked, subscription ended");
                    break;
                }
                Event::Batch(None) => {
                    debug!(collection = %self.collection, "store stream ended");
                    break;
                }
                Event::Batch(Some(Err(e))) => {
                    warn!(collection = %self.collection, error = %e, "store subscription failed");
                    let _ = tx.send(Err(VaultError::Store(e))).await;
                    break;
                }
                Event::Batch(Some(Ok(docs))) => docs,
            };

            // Never start a decrypt with a key the session has withdrawn.
            if !self.key_is_current() {
                break;
            }

            let schema = self.schema;
            let key = Arc::clone(&self.key);
            let policy = self.policy;
            let projected =
                tokio::task::spawn_blocking(move || project_batch(schema, &docs, &key, policy))
                    .await;

            let projection = match projected {
                Ok(p) => p,
                Err(e) => {
                    warn!(collection = %self.collection, error = %e, "decrypt task failed");
                    break;
                }
            };

            // A lock that landed mid-decrypt wins; the result is dropped.
            if !self.key_is_current() {
                debug!(collection = %self.collection, "discarding batch decrypted before lock");
                break;
            }

            // Wait for buffer space; a lock while waiting drops the batch.
            let Some(permit) = self.reserve_while_unlocked(&tx).await else {
                debug!(collection = %self.collection, "batch not published, subscription ending");
                break;
            };
            sequence += 1;
            permit.send(Ok(Snapshot {
                sequence,
                records: projection.records,
                undecryptable: projection.undecryptable,
            }));
        }

        debug!(collection = %self.collection, published = sequence, "subscription stopped");
    }

    async fn reserve_while_unlocked<'a>(
        &mut self,
        tx: &'a mpsc::Sender<Result<Snapshot>>,
    ) -> Option<mpsc::Permit<'a, Result<Snapshot>>> {
        loop {
            tokio::select! {
                biased;
                changed = self.session.changed() => {
                    if changed.is_err() || !self.key_is_current() {
                        return None;
                    }
                }
                permit = tx.reserve() => {
                    return permit.ok().filter(|_| self.key_is_current());
                }
            }
        }
    }

    fn key_is_current(&self) -> bool {
        matches!(
            &*self.session.borrow(),
            VaultSessionState::Unlocked(live) if Arc::ptr_eq(live, &self.key)
        )
    }
}
