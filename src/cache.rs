//! Cache gateway: "what is already known, what is missing" queries over the
//! metadata store, and best-effort write-back.
//!
//! Read failures propagate (the engine cannot answer without knowing what is
//! cached); write failures are logged and swallowed, because a freshly
//! fetched record is valid whether or not the cache accepted it.

use crate::error::{ResolveError, Result};
use crate::model::{FieldSet, Service, Video};
use crate::store::MetadataStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Wraps the external store and phrases lookups in missing-field terms.
#[derive(Clone)]
pub struct CacheGateway {
    store: Arc<dyn MetadataStore>,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// The full field schema the store tracks.
    pub fn known_fields(&self) -> FieldSet {
        self.store.known_fields()
    }

    /// Look up one identity: the stored record (or an identity stub when the
    /// record has never been seen) plus the fields still missing from it.
    pub async fn resolve_single(
        &self,
        service: Service,
        id: &str,
    ) -> Result<(Video, FieldSet)> {
        let known = self.store.known_fields();
        let record = self
            .store
            .get(service, id)
            .await
            .map_err(ResolveError::Store)?
            .unwrap_or_else(|| Video::stub(service, id));
        let missing = record.missing_fields(known);
        debug!(service = %service, id = %id, missing = %missing, "cache lookup");
        Ok((record, missing))
    }

    /// Batched lookup; each result position corresponds to the input
    /// position.
    pub async fn resolve_batch(
        &self,
        keys: &[(Service, String)],
    ) -> Result<Vec<(Video, FieldSet)>> {
        let known = self.store.known_fields();
        let records = self
            .store
            .get_batch(keys)
            .await
            .map_err(ResolveError::Store)?;
        Ok(keys
            .iter()
            .zip(records)
            .map(|((service, id), record)| {
                let record = record.unwrap_or_else(|| Video::stub(*service, id.clone()));
                let missing = record.missing_fields(known);
                (record, missing)
            })
            .collect())
    }

    /// Persist a merged record. Best-effort: failure is logged, never
    /// surfaced.
    pub async fn write_back(&self, video: &Video) {
        if let Err(err) = self.store.put(video).await {
            warn!(
                service = %video.service,
                id = %video.id,
                error = %err,
                "cache write-back failed"
            );
        }
    }

    /// Persist a batch of merged records, best-effort.
    pub async fn write_back_batch(&self, videos: &[Video]) {
        if videos.is_empty() {
            return;
        }
        if let Err(err) = self.store.put_batch(videos).await {
            warn!(count = videos.len(), error = %err, "batched cache write-back failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn unknown_identity_yields_stub_with_all_fields_missing() {
        let gateway = CacheGateway::new(Arc::new(MemoryStore::new()));
        let (record, missing) = gateway
            .resolve_single(Service::Youtube, "dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(record, Video::stub(Service::Youtube, "dQw4w9WgXcQ"));
        assert_eq!(missing, FieldSet::ALL);
    }

    #[tokio::test]
    async fn partial_record_reports_only_absent_fields() {
        let store = Arc::new(MemoryStore::new());
        let mut v = Video::stub(Service::Vimeo, "123");
        v.title = Some("t".into());
        v.description = Some("d".into());
        v.thumbnail = Some("u".into());
        store.put(&v).await.unwrap();

        let gateway = CacheGateway::new(store);
        let (record, missing) = gateway.resolve_single(Service::Vimeo, "123").await.unwrap();
        assert_eq!(record.title.as_deref(), Some("t"));
        assert_eq!(missing, FieldSet::of(&[Field::Length]));
    }

    #[tokio::test]
    async fn batch_positions_match_input() {
        let store = Arc::new(MemoryStore::new());
        let mut v = Video::stub(Service::Dailymotion, "x2jvvep");
        v.length = Some(10);
        store.put(&v).await.unwrap();

        let gateway = CacheGateway::new(store);
        let keys = vec![
            (Service::Youtube, "dQw4w9WgXcQ".to_string()),
            (Service::Dailymotion, "x2jvvep".to_string()),
        ];
        let results = gateway.resolve_batch(&keys).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1, FieldSet::ALL);
        assert_eq!(results[1].0.length, Some(10));
    }
}
