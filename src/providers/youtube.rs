//! YouTube adapter.
//!
//! Primary source is the Data API v3 `videos.list` endpoint, which supports
//! partial fetches via its `part` parameter: title/description/thumbnail
//! live in `snippet`, duration in `contentDetails`. Batch fetches issue one
//! call per 50-id chunk (the API maximum) for the combined parts list.
//!
//! When the API rejects a call for quota exhaustion and the requested
//! fields include the duration, the adapter degrades to scraping each id's
//! public watch page: an ordered list of regex patterns is tried against the
//! raw markup and the first capturing match is taken as the duration in
//! seconds. The thumbnail is then derived from the static `i.ytimg.com`
//! URL template (best-effort, not authoritative). A shape that needs only
//! the thumbnail skips the scrape entirely and takes the template URL.
//! Other fields stay absent.
//!
//! # API Reference
//! - Endpoint: https://www.googleapis.com/youtube/v3/videos
//! - Documentation: https://developers.google.com/youtube/v3/docs/videos/list

use super::{ProviderError, VideoProvider};
use crate::model::{Field, FieldSet, Service, Video};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// YouTube Data API v3 videos endpoint
const API_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Public watch page, used by the quota fallback
const WATCH_URL: &str = "https://www.youtube.com/watch";

/// Maximum ids per `videos.list` call
const MAX_IDS_PER_CALL: usize = 50;

/// Default timeout for API and scrape requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Ordered duration patterns tried against raw watch-page markup. The first
/// capturing match wins; every capture group is a duration in seconds.
const DURATION_PATTERNS: [&str; 3] = [
    r#"lengthSeconds"\s*:\s*"?(\d+)"#,
    r#"lengthSeconds\\":\\"(\d+)"#,
    r#""length_seconds"\s*:\s*"?(\d+)"#,
];

/// 403 reasons that mean "quota", as opposed to e.g. a revoked key.
const QUOTA_REASONS: [&str; 4] = [
    "quotaExceeded",
    "dailyLimitExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
];

/// YouTube metadata provider.
///
/// Requires an API key; resolving one is the caller's concern (see
/// [`crate::config::Config::resolve_youtube_api_key`]).
pub struct YouTubeProvider {
    http_client: Client,
    api_key: String,
    duration_patterns: Vec<Regex>,
}

impl YouTubeProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            api_key: api_key.into(),
            duration_patterns: DURATION_PATTERNS
                .iter()
                .map(|p| Regex::new(p).expect("invalid duration pattern"))
                .collect(),
        }
    }

    /// Map a field set to the minimum `part` parameter covering it.
    fn parts_for(fields: FieldSet) -> Result<String, ProviderError> {
        let mut parts = Vec::new();
        if fields.contains(Field::Title)
            || fields.contains(Field::Description)
            || fields.contains(Field::Thumbnail)
        {
            parts.push("snippet");
        }
        if fields.contains(Field::Length) {
            parts.push("contentDetails");
        }
        if parts.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "no YouTube API parts cover an empty field set".to_string(),
            ));
        }
        Ok(parts.join(","))
    }

    /// One `videos.list` call for up to [`MAX_IDS_PER_CALL`] ids.
    async fn list_videos(
        &self,
        ids: &[String],
        parts: &str,
    ) -> Result<HashMap<String, Video>, ProviderError> {
        debug!(count = ids.len(), parts = parts, "YouTube videos.list");

        let response = self
            .http_client
            .get(API_URL)
            .query(&[
                ("id", ids.join(",").as_str()),
                ("part", parts),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("YouTube API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 403 && is_quota_error(&body) {
                return Err(ProviderError::OutOfQuota);
            }
            return Err(ProviderError::Unavailable(format!(
                "YouTube API returned {}: {}",
                status, body
            )));
        }

        let listing: VideoListResponse = response.json().await.map_err(|e| {
            ProviderError::Unavailable(format!("failed to parse YouTube response: {}", e))
        })?;

        Ok(listing
            .items
            .into_iter()
            .map(|item| (item.id.clone(), item.into_video()))
            .collect())
    }

    /// Quota fallback: fetch each watch page and regex-extract the duration.
    async fn scrape_durations(&self, ids: &[String]) -> HashMap<String, Video> {
        let mut out = HashMap::new();
        for id in ids {
            match self.scrape_one(id).await {
                Some(video) => {
                    out.insert(id.clone(), video);
                }
                None => debug!(id = %id, "watch-page fallback yielded no duration"),
            }
        }
        out
    }

    async fn scrape_one(&self, id: &str) -> Option<Video> {
        let response = self
            .http_client
            .get(WATCH_URL)
            .query(&[("v", id)])
            .send()
            .await
            .ok()?;
        let body = response.text().await.ok()?;
        let length = self.extract_duration(&body)?;
        let mut video = Video::stub(Service::Youtube, id);
        video.length = Some(length);
        video.thumbnail = Some(fallback_thumbnail(id));
        Some(video)
    }

    /// Try each duration pattern in order; first capturing match wins.
    fn extract_duration(&self, page: &str) -> Option<u32> {
        for pattern in &self.duration_patterns {
            if let Some(m) = pattern.captures(page).and_then(|c| c.get(1)) {
                if let Ok(seconds) = m.as_str().parse() {
                    return Some(seconds);
                }
            }
        }
        None
    }
}

#[async_trait]
impl VideoProvider for YouTubeProvider {
    fn service(&self) -> Service {
        Service::Youtube
    }

    fn name(&self) -> &'static str {
        "YouTube"
    }

    async fn fetch(
        &self,
        ids: &[String],
        only: Option<FieldSet>,
    ) -> Result<HashMap<String, Video>, ProviderError> {
        let requested = only.unwrap_or(FieldSet::ALL);
        let parts = Self::parts_for(requested)?;

        let mut out = HashMap::new();
        let mut chunks = ids.chunks(MAX_IDS_PER_CALL);
        while let Some(chunk) = chunks.next() {
            match self.list_videos(chunk, &parts).await {
                Ok(items) => out.extend(items),
                Err(ProviderError::OutOfQuota) => {
                    if !requested.contains(Field::Length)
                        && !requested.contains(Field::Thumbnail)
                    {
                        // Nothing the fallback can supply was asked for.
                        return Err(ProviderError::OutOfQuota);
                    }
                    let remaining: Vec<String> =
                        chunk.iter().cloned().chain(chunks.flatten().cloned()).collect();
                    if requested.contains(Field::Length) {
                        warn!(
                            remaining = remaining.len(),
                            "YouTube quota exhausted; falling back to watch-page scrape"
                        );
                        out.extend(self.scrape_durations(&remaining).await);
                    } else {
                        // Thumbnail-only shape: the URL template needs no
                        // network at all.
                        warn!(
                            remaining = remaining.len(),
                            "YouTube quota exhausted; serving template thumbnails"
                        );
                        out.extend(template_thumbnails(&remaining));
                    }
                    return Ok(out);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}

/// Deterministic thumbnail URL, keyed by id. Best-effort: the image exists
/// for nearly every public video but is not confirmed against the API.
fn fallback_thumbnail(id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id)
}

/// Thumbnail-only records from the URL template, one per id.
fn template_thumbnails(ids: &[String]) -> HashMap<String, Video> {
    ids.iter()
        .map(|id| {
            let mut video = Video::stub(Service::Youtube, id.clone());
            video.thumbnail = Some(fallback_thumbnail(id));
            (id.clone(), video)
        })
        .collect()
}

/// Does a 403 body carry a quota-style rejection reason?
fn is_quota_error(body: &str) -> bool {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    json["error"]["errors"]
        .as_array()
        .map(|errors| {
            errors.iter().any(|e| {
                e["reason"]
                    .as_str()
                    .map(|r| QUOTA_REASONS.contains(&r))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

/// Parse an ISO-8601 duration ("PT4M13S", "PT1H2M3S") to whole seconds.
fn parse_iso8601_duration(s: &str) -> Option<u32> {
    let rest = s.strip_prefix('P')?;
    let mut seconds: u64 = 0;
    let mut in_time = false;
    let mut digits = String::new();
    for ch in rest.chars() {
        match ch {
            'T' => in_time = true,
            '0'..='9' => digits.push(ch),
            unit => {
                let value: u64 = digits.parse().ok()?;
                digits.clear();
                let multiplier = match (unit, in_time) {
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                seconds += value * multiplier;
            }
        }
    }
    if !digits.is_empty() {
        return None; // trailing number without a unit
    }
    u32::try_from(seconds).ok()
}

// ============================================================================
// YouTube API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Option<Snippet>,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

impl VideoItem {
    fn into_video(self) -> Video {
        let mut video = Video::stub(Service::Youtube, self.id);
        if let Some(snippet) = self.snippet {
            video.title = snippet.title;
            video.description = snippet.description;
            video.thumbnail = snippet.thumbnails.and_then(|t| {
                t.medium.or(t.high).or(t.default).map(|thumb| thumb.url)
            });
        }
        if let Some(details) = self.content_details {
            video.length = details.duration.as_deref().and_then(parse_iso8601_duration);
        }
        video
    }
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_cover_the_requested_fields() {
        let snippet_only = FieldSet::of(&[Field::Title, Field::Description]);
        assert_eq!(YouTubeProvider::parts_for(snippet_only).unwrap(), "snippet");

        let length_only = FieldSet::of(&[Field::Length]);
        assert_eq!(
            YouTubeProvider::parts_for(length_only).unwrap(),
            "contentDetails"
        );

        assert_eq!(
            YouTubeProvider::parts_for(FieldSet::ALL).unwrap(),
            "snippet,contentDetails"
        );
    }

    #[test]
    fn empty_field_set_is_a_caller_error() {
        assert!(matches!(
            YouTubeProvider::parts_for(FieldSet::EMPTY),
            Err(ProviderError::InvalidRequest(_))
        ));
    }

    #[test]
    fn iso8601_duration_parsing() {
        assert_eq!(parse_iso8601_duration("PT3M32S"), Some(212));
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT2H"), Some(7200));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86401));
        assert_eq!(parse_iso8601_duration("garbage"), None);
        assert_eq!(parse_iso8601_duration("PT5"), None);
    }

    #[test]
    fn duration_extraction_from_page_markup() {
        let provider = YouTubeProvider::new("key");
        let page = r#"...,"lengthSeconds":"212","channelId":"UC..."#;
        assert_eq!(provider.extract_duration(page), Some(212));

        let escaped = r#"{\"videoDetails\":{\"lengthSeconds\":\"98\"}}"#;
        assert_eq!(provider.extract_duration(escaped), Some(98));

        assert_eq!(provider.extract_duration("<html>nothing here</html>"), None);
    }

    #[test]
    fn duration_extraction_without_a_leading_quote() {
        // Truncated markup can start mid-token; the key needs no preceding
        // quote to match.
        let provider = YouTubeProvider::new("key");
        assert_eq!(provider.extract_duration(r#"lengthSeconds":"212"#), Some(212));
    }

    #[test]
    fn duration_patterns_are_tried_in_order() {
        let provider = YouTubeProvider::new("key");
        // Both the primary and a later pattern match; the primary wins.
        let page = r#""lengthSeconds":"100" ... "length_seconds":"999""#;
        assert_eq!(provider.extract_duration(page), Some(100));
    }

    #[test]
    fn fallback_thumbnail_is_keyed_by_id() {
        assert_eq!(
            fallback_thumbnail("dQw4w9WgXcQ"),
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
    }

    #[test]
    fn template_thumbnails_carry_only_the_thumbnail() {
        let ids = vec!["dQw4w9WgXcQ".to_string(), "9bZkp7q19f0".to_string()];
        let records = template_thumbnails(&ids);
        assert_eq!(records.len(), 2);
        let video = &records["9bZkp7q19f0"];
        assert_eq!(
            video.thumbnail.as_deref(),
            Some("https://i.ytimg.com/vi/9bZkp7q19f0/hqdefault.jpg")
        );
        assert_eq!(video.present_fields(), FieldSet::of(&[Field::Thumbnail]));
    }

    #[test]
    fn quota_rejections_are_recognized() {
        let quota = r#"{"error":{"code":403,"errors":[{"reason":"quotaExceeded","message":"..."}]}}"#;
        assert!(is_quota_error(quota));

        let forbidden = r#"{"error":{"code":403,"errors":[{"reason":"forbidden"}]}}"#;
        assert!(!is_quota_error(forbidden));

        assert!(!is_quota_error("not even json"));
    }

    #[test]
    fn api_items_map_to_records() {
        let payload = r#"{
            "items": [{
                "id": "dQw4w9WgXcQ",
                "snippet": {
                    "title": "Video",
                    "description": "Desc",
                    "thumbnails": {"medium": {"url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg"}}
                },
                "contentDetails": {"duration": "PT3M32S"}
            }]
        }"#;
        let listing: VideoListResponse = serde_json::from_str(payload).unwrap();
        let video = listing.items.into_iter().next().unwrap().into_video();
        assert_eq!(video.title.as_deref(), Some("Video"));
        assert_eq!(video.length, Some(212));
        assert_eq!(
            video.thumbnail.as_deref(),
            Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg")
        );
    }
}
