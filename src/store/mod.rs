//! Document store abstraction.
//!
//! The vault never talks to a database directly.  It reads and writes
//! documents through the `DocumentStore` trait: a per-identity tree of
//! documents addressed by slash-separated paths (`users/<id>/passwords/<rec>`),
//! with push subscriptions on collections.
//!
//! Two adapters ship with the crate:
//! - `MemoryStore`: in-process, used by tests and as the file store's cache
//! - `FileStore`: the memory store persisted to a single JSON file

pub mod file;
pub mod memory;
pub mod value;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use value::{Document, Fields, Value};

/// Root collection holding one document per identity.
pub const USERS_COLLECTION: &str = "users";

/// Errors raised by a document store (the "transport").
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store data is corrupt: {0}")]
    Corrupt(String),

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A live, ordered sequence of complete collection snapshots.
pub type SnapshotStream = BoxStream<'static, StoreResult<Vec<Document>>>;

/// A remote document collection service with change notification.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document.  `Ok(None)` means it does not exist.
    async fn get_document(&self, path: &str) -> StoreResult<Option<Document>>;

    /// Create or fully overwrite a document.
    ///
    /// `Value::ServerTimestamp` sentinels are replaced by the store clock.
    async fn put_document(&self, path: &str, fields: Fields) -> StoreResult<()>;

    /// Merge `fields` into an existing document.
    ///
    /// Fails with `StoreError::NotFound` if the document does not exist.
    async fn update_fields(&self, path: &str, fields: Fields) -> StoreResult<()>;

    /// Delete a document.  Deleting a missing document is not an error.
    async fn delete_document(&self, path: &str) -> StoreResult<()>;

    /// Subscribe to the direct children of `collection`, ordered by the
    /// `order_by` attribute.
    ///
    /// The stream yields the current snapshot immediately, then a fresh
    /// complete snapshot after every change to the collection.
    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
        descending: bool,
    ) -> StoreResult<SnapshotStream>;
}

/// Path of the per-identity document (`users/<identity>`).
pub fn user_path(identity_id: &str) -> String {
    format!("{USERS_COLLECTION}/{identity_id}")
}

/// Path of a per-identity sub-collection (`users/<identity>/<collection>`).
pub fn collection_path(identity_id: &str, collection: &str) -> String {
    format!("{USERS_COLLECTION}/{identity_id}/{collection}")
}

/// Path of a document inside a collection.
pub fn document_path(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

/// Split a document path into `(parent collection, document id)`.
///
/// Returns `None` for a path without a `/`.
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    path.rsplit_once('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_nested_under_identity() {
        assert_eq!(user_path("u1"), "users/u1");
        assert_eq!(collection_path("u1", "passwords"), "users/u1/passwords");
        assert_eq!(
            document_path("users/u1/passwords", "abc"),
            "users/u1/passwords/abc"
        );
    }

    #[test]
    fn split_path_returns_parent_and_id() {
        assert_eq!(
            split_path("users/u1/contacts/x"),
            Some(("users/u1/contacts", "x"))
        );
        assert_eq!(split_path("users"), None);
    }
}
