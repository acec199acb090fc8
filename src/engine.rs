//! Resolution engine.
//!
//! Orchestrates cache lookups, provider fetches, and merges. The central
//! idea is two-level grouping: requests are partitioned by provider, then
//! sub-partitioned by identical missing-field shape, so N lookups collapse
//! into the minimum number of provider calls consistent with each item's
//! distinct data needs. Items already complete in cache never reach an
//! adapter, and no adapter is ever asked for a field nobody needs.
//!
//! All (provider, shape) group calls are issued concurrently and joined as
//! a set; one group's failure never cancels its siblings.

use crate::cache::CacheGateway;
use crate::config::Config;
use crate::error::{ResolveError, Result};
use crate::model::{FieldSet, Service, Video};
use crate::providers::{
    DailymotionProvider, ProviderError, VideoProvider, VimeoProvider, YouTubeProvider,
};
use crate::store::MetadataStore;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// One adapter call: a provider, a missing-field shape, and the ids (with
/// their pre-fetch cached records) that share that shape.
struct FetchGroup {
    provider: Arc<dyn VideoProvider>,
    service: Service,
    shape: FieldSet,
    items: Vec<(String, Video)>,
}

/// Metadata resolution engine over a store and a set of provider adapters.
///
/// Dependencies are explicit constructor arguments — no global client or
/// store handles — so embedders can wire test doubles or run several
/// independent instances.
pub struct ResolutionEngine {
    cache: CacheGateway,
    providers: HashMap<Service, Arc<dyn VideoProvider>>,
}

impl ResolutionEngine {
    pub fn new(store: Arc<dyn MetadataStore>, providers: Vec<Arc<dyn VideoProvider>>) -> Self {
        Self {
            cache: CacheGateway::new(store),
            providers: providers
                .into_iter()
                .map(|p| (p.service(), p))
                .collect(),
        }
    }

    /// Wire the three real providers from configuration. Fails when the
    /// YouTube API key is not configured.
    pub fn from_config(store: Arc<dyn MetadataStore>, config: &Config) -> Result<Self> {
        let timeout = config.request_timeout();
        let api_key = config.resolve_youtube_api_key()?;
        let providers: Vec<Arc<dyn VideoProvider>> = vec![
            Arc::new(YouTubeProvider::with_timeout(api_key, timeout)),
            Arc::new(VimeoProvider::with_timeout(timeout)),
            Arc::new(DailymotionProvider::with_timeout(timeout)),
        ];
        Ok(Self::new(store, providers))
    }

    fn provider(&self, service: Service) -> Result<&Arc<dyn VideoProvider>> {
        self.providers
            .get(&service)
            .ok_or_else(|| ResolveError::Config(format!("no provider registered for {}", service)))
    }

    /// Resolve a single (service, id) to a fully populated record.
    ///
    /// `Ok(None)` means the provider has no metadata for the id (deleted,
    /// unembeddable) — a legitimate outcome distinct from any error.
    pub async fn resolve_one(&self, service: Service, id: &str) -> Result<Option<Video>> {
        if !service.valid_id(id) {
            return Err(ResolveError::InvalidVideoId {
                service,
                id: id.to_string(),
            });
        }

        let (cached, missing) = self.cache.resolve_single(service, id).await?;
        if missing.is_empty() {
            debug!(service = %service, id = %id, "resolved from cache");
            return Ok(Some(cached));
        }

        let provider = self.provider(service)?;
        debug!(
            service = %service,
            id = %id,
            missing = %missing,
            provider = provider.name(),
            "fetching missing fields"
        );

        match provider.fetch(&[id.to_string()], Some(missing)).await {
            Ok(mut fetched) => match fetched.remove(id) {
                Some(patch) => {
                    let merged = cached.merge(&patch);
                    self.cache.write_back(&merged).await;
                    Ok(Some(merged))
                }
                None => Ok(None),
            },
            Err(ProviderError::OutOfQuota) => {
                if cached.present_fields().is_empty() {
                    Err(ResolveError::OutOfQuota)
                } else {
                    // Partial information beats none: serve the stale record.
                    warn!(
                        service = %service,
                        id = %id,
                        "provider out of quota; returning stale cached record"
                    );
                    Ok(Some(cached))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a batch of identities, preserving input order.
    ///
    /// The output has exactly one entry per input element; `None` marks ids
    /// no metadata could be obtained for. Duplicate input identities yield
    /// identical records at every original position.
    pub async fn resolve_many(
        &self,
        requests: &[(Service, String)],
    ) -> Result<Vec<Option<Video>>> {
        for (service, id) in requests {
            if !service.valid_id(id) {
                return Err(ResolveError::InvalidVideoId {
                    service: *service,
                    id: id.clone(),
                });
            }
        }

        // Partition by service, deduplicating identities: a duplicate input
        // is fetched once and fanned back out during reassembly.
        let mut seen = HashSet::new();
        let mut by_service: HashMap<Service, Vec<(Service, String)>> = HashMap::new();
        for (service, id) in requests {
            if seen.insert((*service, id.clone())) {
                by_service
                    .entry(*service)
                    .or_default()
                    .push((*service, id.clone()));
            }
        }

        let mut resolved: HashMap<(Service, String), Video> = HashMap::new();
        let mut groups: Vec<FetchGroup> = Vec::new();

        for (service, keys) in by_service {
            let cached = self.cache.resolve_batch(&keys).await?;
            let provider = self.provider(service)?.clone();

            // Sub-partition by missing-field shape; complete records bypass
            // the adapter entirely.
            let mut shapes: HashMap<FieldSet, Vec<(String, Video)>> = HashMap::new();
            for ((_, id), (record, missing)) in keys.iter().zip(cached) {
                if missing.is_empty() {
                    resolved.insert((service, id.clone()), record);
                } else {
                    shapes.entry(missing).or_default().push((id.clone(), record));
                }
            }
            for (shape, items) in shapes {
                groups.push(FetchGroup {
                    provider: provider.clone(),
                    service,
                    shape,
                    items,
                });
            }
        }

        debug!(
            requested = requests.len(),
            groups = groups.len(),
            cached = resolved.len(),
            "dispatching grouped fetches"
        );

        // One concurrent adapter call per (provider, shape) group, joined as
        // a set before any merging.
        let outcomes = join_all(groups.into_iter().map(|group| async move {
            let ids: Vec<String> = group.items.iter().map(|(id, _)| id.clone()).collect();
            let result = group.provider.fetch(&ids, Some(group.shape)).await;
            (group, result)
        }))
        .await;

        let mut fresh: Vec<Video> = Vec::new();
        let mut quota_starved = false;

        for (group, result) in outcomes {
            match result {
                Ok(mut fetched) => {
                    for (id, cached) in &group.items {
                        // Ids the adapter dropped stay unresolved: the output
                        // carries None, never an empty placeholder.
                        if let Some(patch) = fetched.remove(id) {
                            let merged = cached.merge(&patch);
                            fresh.push(merged.clone());
                            resolved.insert((group.service, id.clone()), merged);
                        }
                    }
                }
                Err(ProviderError::OutOfQuota) => {
                    warn!(
                        provider = group.provider.name(),
                        shape = %group.shape,
                        "group fetch out of quota; degrading to cached records"
                    );
                    for (id, cached) in &group.items {
                        if cached.present_fields().is_empty() {
                            quota_starved = true;
                        } else {
                            resolved.insert((group.service, id.clone()), cached.clone());
                        }
                    }
                }
                Err(e) => {
                    // Isolated failure: this group's items stay unresolved,
                    // sibling groups are unaffected.
                    warn!(
                        provider = group.provider.name(),
                        shape = %group.shape,
                        error = %e,
                        "group fetch failed"
                    );
                }
            }
        }

        // At least one id had nothing cached and its provider is out of
        // quota: the caller gets the distinct quota signal rather than a
        // silently incomplete batch.
        if quota_starved {
            return Err(ResolveError::OutOfQuota);
        }

        self.cache.write_back_batch(&fresh).await;

        Ok(requests
            .iter()
            .map(|(service, id)| resolved.get(&(*service, id.clone())).cloned())
            .collect())
    }
}
