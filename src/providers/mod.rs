//! Provider adapters.
//!
//! One adapter per video-hosting service. Providers differ in whether the
//! upstream API supports partial-field fetches and in whether an outage is
//! batch-fatal or degrades per id; each adapter owns that policy so the
//! resolution engine stays provider-agnostic.

pub mod dailymotion;
pub mod vimeo;
pub mod youtube;

pub use dailymotion::DailymotionProvider;
pub use vimeo::VimeoProvider;
pub use youtube::YouTubeProvider;

use crate::model::{FieldSet, Service, Video};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Adapter-level failures.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rejected the call because its usage allowance is
    /// exhausted (HTTP 403-equivalent with a quota reason).
    #[error("provider quota exhausted")]
    OutOfQuota,

    /// Transport or parse failure.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The request cannot be expressed upstream (e.g. empty field set).
    #[error("invalid provider request: {0}")]
    InvalidRequest(String),
}

/// A metadata source for one service.
///
/// `fetch` returns a map keyed by id. An id missing from the map means the
/// provider has nothing for it (deleted, unembeddable) — a soft outcome the
/// caller must treat distinctly from an identity-only record with unknown
/// fields.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// The service this adapter fronts.
    fn service(&self) -> Service;

    /// Adapter name for log provenance.
    fn name(&self) -> &'static str;

    /// Fetch metadata for a batch of ids.
    ///
    /// `only = None` requests the full known field set; `Some(set)` restricts
    /// the fetch to those fields where the upstream API allows it. Returned
    /// records may carry more fields than requested (some APIs cannot
    /// subset) but never fewer than the upstream had available.
    async fn fetch(
        &self,
        ids: &[String],
        only: Option<FieldSet>,
    ) -> Result<HashMap<String, Video>, ProviderError>;
}
