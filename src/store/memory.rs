//! In-process document store.
//!
//! Documents live in a `BTreeMap` keyed by full path.  Every write
//! publishes the parent collection path on a broadcast channel; each
//! subscription re-queries its collection when it sees its own path.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::debug;

use super::value::{Document, Fields, Value};
use super::{split_path, DocumentStore, SnapshotStream, StoreError, StoreResult};

/// Capacity of the change-notification channel.  A subscriber that lags
/// behind simply re-queries, so overflow never loses a snapshot.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A cheap-to-clone handle to an in-memory document tree.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    docs: RwLock<BTreeMap<String, Fields>>,
    changes: broadcast::Sender<String>,
    last_timestamp: Mutex<DateTime<Utc>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_documents(BTreeMap::new())
    }

    /// Create a store pre-populated with `docs` (path -> fields).
    pub fn with_documents(docs: BTreeMap<String, Fields>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                docs: RwLock::new(docs),
                changes,
                last_timestamp: Mutex::new(DateTime::<Utc>::MIN_UTC),
            }),
        }
    }

    /// Copy of every stored document (path -> fields).
    pub async fn dump(&self) -> BTreeMap<String, Fields> {
        self.inner.docs.read().await.clone()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.inner.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Replace every `ServerTimestamp` sentinel (nested maps included)
    /// with the store clock.
    async fn resolve_server_timestamps(&self, fields: &mut Fields) {
        let mut last = self.inner.last_timestamp.lock().await;
        stamp_fields(fields, &mut last);
    }

    fn notify(&self, path: &str) {
        if let Some((collection, _)) = split_path(path) {
            // No receivers is fine.
            let _ = self.inner.changes.send(collection.to_string());
        }
    }

    /// Ordered direct children of `collection` that carry `order_by`.
    async fn query(&self, collection: &str, order_by: &str, descending: bool) -> Vec<Document> {
        let docs = self.inner.docs.read().await;
        let prefix = format!("{collection}/");

        let mut result: Vec<Document> = docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .filter(|(_, fields)| fields.get(order_by).is_some_and(|v| !v.is_null()))
            .map(|(path, fields)| Document {
                id: path[prefix.len()..].to_string(),
                fields: fields.clone(),
            })
            .collect();

        result.sort_by(|a, b| {
            let ord = a.fields[order_by].query_cmp(&b.fields[order_by]);
            let ord = if descending { ord.reverse() } else { ord };
            ord.then_with(|| a.id.cmp(&b.id))
        });
        result
    }
}

/// Next value of the store clock: wall time, bumped so that it is
/// strictly greater than every timestamp handed out before.
fn next_timestamp(last: &mut DateTime<Utc>) -> DateTime<Utc> {
    let mut now = Utc::now();
    if now <= *last {
        now = *last + Duration::microseconds(1);
    }
    *last = now;
    now
}

fn stamp_fields(fields: &mut Fields, last: &mut DateTime<Utc>) {
    for value in fields.values_mut() {
        match value {
            Value::ServerTimestamp => *value = Value::Timestamp(next_timestamp(last)),
            Value::Map(nested) => stamp_fields(nested, last),
            _ => {}
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, path: &str) -> StoreResult<Option<Document>> {
        let docs = self.inner.docs.read().await;
        Ok(docs.get(path).map(|fields| Document {
            id: split_path(path).map_or(path, |(_, id)| id).to_string(),
            fields: fields.clone(),
        }))
    }

    async fn put_document(&self, path: &str, mut fields: Fields) -> StoreResult<()> {
        self.resolve_server_timestamps(&mut fields).await;
        self.inner
            .docs
            .write()
            .await
            .insert(path.to_string(), fields);
        debug!(path, "document written");
        self.notify(path);
        Ok(())
    }

    async fn update_fields(&self, path: &str, mut fields: Fields) -> StoreResult<()> {
        self.resolve_server_timestamps(&mut fields).await;
        {
            let mut docs = self.inner.docs.write().await;
            let existing = docs
                .get_mut(path)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            existing.extend(fields);
        }
        debug!(path, "document updated");
        self.notify(path);
        Ok(())
    }

    async fn delete_document(&self, path: &str) -> StoreResult<()> {
        let removed = self.inner.docs.write().await.remove(path).is_some();
        if removed {
            debug!(path, "document deleted");
            self.notify(path);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
        descending: bool,
    ) -> StoreResult<SnapshotStream> {
        // Register for changes before the first query so no write slips
        // between the initial snapshot and the first notification.
        let changes = self.inner.changes.subscribe();
        let store = self.clone();
        let collection = collection.to_string();
        let order_by = order_by.to_string();

        let stream = futures::stream::unfold(
            (store, changes, true),
            move |(store, mut changes, first)| {
                let collection = collection.clone();
                let order_by = order_by.clone();
                async move {
                    if !first {
                        loop {
                            match changes.recv().await {
                                Ok(changed) if changed == collection => break,
                                Ok(_) => continue,
                                Err(RecvError::Lagged(skipped)) => {
                                    debug!(%collection, skipped, "change feed lagged, re-querying");
                                    break;
                                }
                                Err(RecvError::Closed) => return None,
                            }
                        }
                    }
                    let docs = store.query(&collection, &order_by, descending).await;
                    Some((Ok(docs), (store, changes, false)))
                }
            },
        );

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn put_get_roundtrip_resolves_server_timestamp() {
        let store = MemoryStore::new();
        store
            .put_document(
                "users/u1",
                fields(&[("name", "a".into()), ("at", Value::ServerTimestamp)]),
            )
            .await
            .unwrap();

        let doc = store.get_document("users/u1").await.unwrap().unwrap();
        assert_eq!(doc.id, "u1");
        assert_eq!(doc.get("name").and_then(Value::as_str), Some("a"));
        assert!(doc.get("at").and_then(Value::as_timestamp).is_some());
    }

    #[tokio::test]
    async fn server_timestamps_strictly_increase() {
        let store = MemoryStore::new();
        let mut previous = None;
        for i in 0..20 {
            let path = format!("c/{i}");
            store
                .put_document(&path, fields(&[("at", Value::ServerTimestamp)]))
                .await
                .unwrap();
            let at = store
                .get_document(&path)
                .await
                .unwrap()
                .unwrap()
                .get("at")
                .and_then(Value::as_timestamp)
                .unwrap();
            if let Some(prev) = previous {
                assert!(at > prev);
            }
            previous = Some(at);
        }
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_fields("c/nope", fields(&[("a", "b".into())]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(p) if p == "c/nope"));
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryStore::new();
        store
            .put_document("c/1", fields(&[("a", "1".into()), ("b", "2".into())]))
            .await
            .unwrap();
        store
            .update_fields("c/1", fields(&[("b", "3".into())]))
            .await
            .unwrap();
        let doc = store.get_document("c/1").await.unwrap().unwrap();
        assert_eq!(doc.get("a").and_then(Value::as_str), Some("1"));
        assert_eq!(doc.get("b").and_then(Value::as_str), Some("3"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.put_document("c/1", Fields::new()).await.unwrap();
        store.delete_document("c/1").await.unwrap();
        store.delete_document("c/1").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn subscription_orders_and_filters_children() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c"] {
            store
                .put_document(
                    &format!("users/u1/items/{id}"),
                    fields(&[("createdAt", Value::ServerTimestamp)]),
                )
                .await
                .unwrap();
        }
        // Nested and foreign documents are not children of the collection.
        store
            .put_document(
                "users/u1/items/a/sub/x",
                fields(&[("createdAt", Value::ServerTimestamp)]),
            )
            .await
            .unwrap();
        store
            .put_document(
                "users/u2/items/z",
                fields(&[("createdAt", Value::ServerTimestamp)]),
            )
            .await
            .unwrap();
        // No ordering attribute: excluded from the query.
        store
            .put_document("users/u1/items/d", Fields::new())
            .await
            .unwrap();

        let mut stream = store
            .subscribe("users/u1/items", "createdAt", true)
            .await
            .unwrap();
        let first = stream.next().await.unwrap().unwrap();
        let ids: Vec<_> = first.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
    }

    #[tokio::test]
    async fn subscription_pushes_after_each_change() {
        let store = MemoryStore::new();
        let mut stream = store
            .subscribe("users/u1/items", "createdAt", false)
            .await
            .unwrap();
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        // A change elsewhere does not wake the subscription on its own.
        store
            .put_document("users/u2/items/x", fields(&[("createdAt", Value::ServerTimestamp)]))
            .await
            .unwrap();
        store
            .put_document("users/u1/items/x", fields(&[("createdAt", Value::ServerTimestamp)]))
            .await
            .unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "x");

        store.delete_document("users/u1/items/x").await.unwrap();
        assert!(stream.next().await.unwrap().unwrap().is_empty());
    }
}
