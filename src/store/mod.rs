//! Persistent metadata store contract.
//!
//! The store is an external collaborator: it holds previously fetched field
//! values per (service, id) and defines the full known field schema. The
//! engine only depends on this trait; `SqliteStore` is the shipped
//! persistent implementation and `MemoryStore` backs tests and embedders
//! that do not want persistence.
//!
//! Eviction and expiry are the store's own concern; the engine never
//! deletes records.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::model::{FieldSet, Service, Video};
use async_trait::async_trait;
use thiserror::Error;

/// Store-layer failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation error (wraps sqlx::Error)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal store error (test doubles, corrupt rows)
    #[error("store error: {0}")]
    Internal(String),
}

/// Key-value store of partial video records keyed by (service, id).
///
/// Batch reads are position-preserving: the result has exactly one entry
/// per input key, in input order. The store has no transactional
/// guarantees; the merge rule makes concurrent fetch-and-write for the same
/// identity safe regardless of write order.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// The full field schema this store tracks, in schema order.
    fn known_fields(&self) -> FieldSet {
        FieldSet::ALL
    }

    /// Look up one record. `None` means the identity has never been stored.
    async fn get(&self, service: Service, id: &str) -> Result<Option<Video>, StoreError>;

    /// Batched lookup, one entry per key, input order preserved.
    async fn get_batch(
        &self,
        keys: &[(Service, String)],
    ) -> Result<Vec<Option<Video>>, StoreError>;

    /// Persist a record, merging field-wise into any existing row: a present
    /// stored value is never overwritten by an absent one.
    async fn put(&self, video: &Video) -> Result<(), StoreError>;

    /// Persist several records; same merge semantics as [`put`](Self::put).
    async fn put_batch(&self, videos: &[Video]) -> Result<(), StoreError>;
}
