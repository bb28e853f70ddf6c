//! Encrypted collection synchronization.
//!
//! This module provides:
//! - Declarative per-kind attribute schemas (`schema`)
//! - Field encoding and batch decryption into `DecryptedView`s (`projection`)
//! - The generic `CollectionSynchronizer` (`synchronizer`)
//! - Cancelable live `Subscription`s (`subscription`)

pub mod projection;
pub mod schema;
pub mod subscription;
pub mod synchronizer;

pub use projection::{DecryptedView, RecordFields, RecordId, Snapshot};
pub use schema::{AttributeSpec, Presence, Protection, RecordSchema, CREATED_AT, UPDATED_AT};
pub use subscription::Subscription;
pub use synchronizer::{CollectionSynchronizer, DEFAULT_SNAPSHOT_BUFFER};
