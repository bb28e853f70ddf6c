//! Single-file JSON document store.
//!
//! The whole document tree is kept in a `MemoryStore` and rewritten to
//! disk after every mutation:
//!
//! ```text
//! { "version": 1, "documents": { "<path>": { "<attr>": <value>, ... }, ... } }
//! ```
//!
//! Writes go to a temp file in the same directory followed by a rename,
//! so readers never see a half-written store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::memory::MemoryStore;
use super::value::{Document, Fields};
use super::{DocumentStore, SnapshotStream, StoreError, StoreResult};

/// Current on-disk format version.
const CURRENT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u8,
    documents: BTreeMap<String, Fields>,
}

/// A `DocumentStore` persisted to one JSON file.
pub struct FileStore {
    path: PathBuf,
    memory: MemoryStore,
    /// Serializes mutate-then-persist so the file always reflects a
    /// state the memory store actually passed through.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let documents = if path.exists() {
            let data = std::fs::read(path)?;
            let file: StoreFile = serde_json::from_slice(&data)
                .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
            if file.version != CURRENT_VERSION {
                return Err(StoreError::Corrupt(format!(
                    "unsupported store version {}, expected {CURRENT_VERSION}",
                    file.version
                )));
            }
            file.documents
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), documents = documents.len(), "file store opened");

        Ok(Self {
            path: path.to_path_buf(),
            memory: MemoryStore::with_documents(documents),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> StoreResult<()> {
        let file = StoreFile {
            version: CURRENT_VERSION,
            documents: self.memory.dump().await,
        };
        let buf = serde_json::to_vec_pretty(&file)
            .map_err(|e| StoreError::Corrupt(format!("serialize store: {e}")))?;

        let parent = self.path.parent().unwrap_or(Path::new("."));
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy()
        ));

        tokio::fs::write(&tmp_path, &buf).await?;

        // Owner-only: the file holds salts and ciphertext.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get_document(&self, path: &str) -> StoreResult<Option<Document>> {
        self.memory.get_document(path).await
    }

    async fn put_document(&self, path: &str, fields: Fields) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.memory.put_document(path, fields).await?;
        self.persist().await
    }

    async fn update_fields(&self, path: &str, fields: Fields) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.memory.update_fields(path, fields).await?;
        self.persist().await
    }

    async fn delete_document(&self, path: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.memory.delete_document(path).await?;
        self.persist().await
    }

    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
        descending: bool,
    ) -> StoreResult<SnapshotStream> {
        self.memory.subscribe(collection, order_by, descending).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Value;
    use tempfile::TempDir;

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::open(&path).unwrap();
        let mut fields = Fields::new();
        fields.insert("name".into(), Value::from("alice"));
        fields.insert("at".into(), Value::ServerTimestamp);
        store.put_document("users/u1", fields).await.unwrap();
        assert!(path.exists());

        let reopened = FileStore::open(&path).unwrap();
        let doc = reopened.get_document("users/u1").await.unwrap().unwrap();
        assert_eq!(doc.get("name").and_then(Value::as_str), Some("alice"));
        assert!(doc.get("at").and_then(Value::as_timestamp).is_some());
    }

    #[tokio::test]
    async fn delete_is_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.put_document("c/1", Fields::new()).await.unwrap();
        store.delete_document("c/1").await.unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert!(reopened.get_document("c/1").await.unwrap().is_none());
    }

    #[test]
    fn open_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn open_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, br#"{"version":9,"documents":{}}"#).unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::open(&path).unwrap();
        store.put_document("c/1", Fields::new()).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
