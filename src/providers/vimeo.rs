//! Vimeo adapter.
//!
//! Uses the public embed-info endpoint, which has no partial-field support:
//! every fetch returns the full field set and the `only` hint is ignored.
//! A 403/404 means the video is unembeddable or gone — the id is silently
//! dropped from the result. Any other transport failure degrades that id to
//! an identity-only record instead of failing the batch.
//!
//! # API Reference
//! - Endpoint: https://vimeo.com/api/v2/video/{id}.json

use super::{ProviderError, VideoProvider};
use crate::model::{FieldSet, Service, Video};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const API_URL: &str = "https://vimeo.com/api/v2/video";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Vimeo metadata provider. No credential required.
pub struct VimeoProvider {
    http_client: Client,
}

impl VimeoProvider {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Fetch one id. `Ok(None)` means the video is unembeddable or gone;
    /// `Err` is a transport-level failure the caller degrades per policy.
    async fn fetch_one(&self, id: &str) -> Result<Option<Video>, String> {
        let url = format!("{}/{}.json", API_URL, id);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Vimeo request failed: {}", e))?;

        let status = response.status();
        if status.as_u16() == 403 || status.as_u16() == 404 {
            debug!(id = %id, status = %status, "Vimeo video unembeddable or gone");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(format!("Vimeo returned {}", status));
        }

        let entries: Vec<VimeoEntry> = response
            .json()
            .await
            .map_err(|e| format!("failed to parse Vimeo response: {}", e))?;
        Ok(entries.into_iter().next().map(|entry| entry.into_video(id)))
    }
}

impl Default for VimeoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoProvider for VimeoProvider {
    fn service(&self) -> Service {
        Service::Vimeo
    }

    fn name(&self) -> &'static str {
        "Vimeo"
    }

    async fn fetch(
        &self,
        ids: &[String],
        _only: Option<FieldSet>,
    ) -> Result<HashMap<String, Video>, ProviderError> {
        let mut out = HashMap::new();
        for id in ids {
            match self.fetch_one(id).await {
                Ok(Some(video)) => {
                    out.insert(id.clone(), video);
                }
                Ok(None) => {} // no metadata for this id, a valid outcome
                Err(msg) => {
                    // Transport trouble: keep the batch going with an
                    // identity-only record for this id.
                    warn!(id = %id, error = %msg, "Vimeo fetch degraded to identity record");
                    out.insert(id.clone(), Video::stub(Service::Vimeo, id.clone()));
                }
            }
        }
        Ok(out)
    }
}

// ============================================================================
// Vimeo API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct VimeoEntry {
    title: Option<String>,
    description: Option<String>,
    thumbnail_large: Option<String>,
    thumbnail_medium: Option<String>,
    duration: Option<u32>,
}

impl VimeoEntry {
    fn into_video(self, id: &str) -> Video {
        Video {
            service: Service::Vimeo,
            id: id.to_string(),
            title: self.title,
            description: self.description,
            thumbnail: self.thumbnail_large.or(self.thumbnail_medium),
            length: self.duration,
        }
    }
}
