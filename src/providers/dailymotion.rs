//! Dailymotion adapter.
//!
//! The metadata endpoint takes an explicit `fields` list but is cheap and
//! un-metered for this field set, so the adapter always requests the full
//! schema. Any failure for an id is logged and the id is dropped from the
//! result; the rest of the batch proceeds.
//!
//! # API Reference
//! - Endpoint: https://api.dailymotion.com/video/{id}

use super::{ProviderError, VideoProvider};
use crate::model::{FieldSet, Service, Video};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

const API_URL: &str = "https://api.dailymotion.com/video";

/// Fields requested from the metadata endpoint, mirroring the record schema.
const API_FIELDS: &str = "title,description,thumbnail_480_url,duration";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Dailymotion metadata provider. No credential required.
pub struct DailymotionProvider {
    http_client: Client,
}

impl DailymotionProvider {
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

    async fn fetch_one(&self, id: &str) -> Result<Video, String> {
        let url = format!("{}/{}", API_URL, id);
        let response = self
            .http_client
            .get(&url)
            .query(&[("fields", API_FIELDS)])
            .send()
            .await
            .map_err(|e| format!("Dailymotion request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Dailymotion returned {}", status));
        }

        let entry: DailymotionEntry = response
            .json()
            .await
            .map_err(|e| format!("failed to parse Dailymotion response: {}", e))?;
        Ok(entry.into_video(id))
    }
}

impl Default for DailymotionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoProvider for DailymotionProvider {
    fn service(&self) -> Service {
        Service::Dailymotion
    }

    fn name(&self) -> &'static str {
        "Dailymotion"
    }

    async fn fetch(
        &self,
        ids: &[String],
        _only: Option<FieldSet>,
    ) -> Result<HashMap<String, Video>, ProviderError> {
        let mut out = HashMap::new();
        for id in ids {
            match self.fetch_one(id).await {
                Ok(video) => {
                    out.insert(id.clone(), video);
                }
                Err(msg) => {
                    warn!(id = %id, error = %msg, "Dailymotion fetch failed; id dropped");
                }
            }
        }
        Ok(out)
    }
}

// ============================================================================
// Dailymotion API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct DailymotionEntry {
    title: Option<String>,
    description: Option<String>,
    thumbnail_480_url: Option<String>,
    duration: Option<u32>,
}

impl DailymotionEntry {
    fn into_video(self, id: &str) -> Video {
        Video {
            service: Service::Dailymotion,
            id: id.to_string(),
            title: self.title,
            description: self.description,
            thumbnail: self.thumbnail_480_url,
            length: self.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_payload_maps_to_record() {
        let payload = r#"{
            "title": "A video",
            "description": "About things",
            "thumbnail_480_url": "https://s2.dmcdn.net/v/abc/x480",
            "duration": 301
        }"#;
        let entry: DailymotionEntry = serde_json::from_str(payload).unwrap();
        let video = entry.into_video("x2jvvep");
        assert_eq!(video.service, Service::Dailymotion);
        assert_eq!(video.id, "x2jvvep");
        assert_eq!(video.length, Some(301));
        assert_eq!(
            video.thumbnail.as_deref(),
            Some("https://s2.dmcdn.net/v/abc/x480")
        );
    }
}
