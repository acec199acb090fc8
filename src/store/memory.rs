//! In-memory metadata store.
//!
//! Backs tests and embedders that do not need persistence. Applies the same
//! field-wise merge on write as the SQLite store, so the two are
//! interchangeable behind [`MetadataStore`].

use super::{MetadataStore, StoreError};
use crate::model::{Service, Video};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// HashMap-backed store guarded by an async RwLock.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(Service, String), Video>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get(&self, service: Service, id: &str) -> Result<Option<Video>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(&(service, id.to_string())).cloned())
    }

    async fn get_batch(
        &self,
        keys: &[(Service, String)],
    ) -> Result<Vec<Option<Video>>, StoreError> {
        let records = self.records.read().await;
        Ok(keys
            .iter()
            .map(|(service, id)| records.get(&(*service, id.clone())).cloned())
            .collect())
    }

    async fn put(&self, video: &Video) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let key = (video.service, video.id.clone());
        let merged = match records.get(&key) {
            Some(existing) => existing.merge(video),
            None => video.clone(),
        };
        records.insert(key, merged);
        Ok(())
    }

    async fn put_batch(&self, videos: &[Video]) -> Result<(), StoreError> {
        for video in videos {
            self.put(video).await?;
        }
        Ok(())
    }
}
