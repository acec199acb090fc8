//! Configuration resolution.
//!
//! Provides two-tier resolution for the YouTube API key with ENV → TOML
//! priority. A key present in several sources logs a warning (potential
//! misconfiguration) and the higher-priority source wins.

use crate::error::{ResolveError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable consulted before the TOML file.
pub const YOUTUBE_API_KEY_ENV: &str = "VIDMETA_YOUTUBE_API_KEY";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Engine configuration, typically loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// YouTube Data API v3 key. Optional here; required to construct the
    /// YouTube provider.
    pub youtube_api_key: Option<String>,
    /// Timeout applied to every provider HTTP request.
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields defaults;
    /// an unreadable or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::Config(format!("read {} failed: {}", path.display(), e)))?;
        let config = toml::from_str(&content)
            .map_err(|e| ResolveError::Config(format!("parse {} failed: {}", path.display(), e)))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Resolve the YouTube API key with ENV → TOML priority.
    ///
    /// Absence is a configuration error: the YouTube provider cannot make a
    /// single call without it.
    pub fn resolve_youtube_api_key(&self) -> Result<String> {
        let env_key = std::env::var(YOUTUBE_API_KEY_ENV)
            .ok()
            .filter(|k| is_valid_key(k));
        let toml_key = self
            .youtube_api_key
            .as_ref()
            .filter(|k| is_valid_key(k))
            .cloned();

        if env_key.is_some() && toml_key.is_some() {
            warn!(
                "YouTube API key found in both {} and TOML config; using environment",
                YOUTUBE_API_KEY_ENV
            );
        }

        env_key.or(toml_key).ok_or_else(|| {
            ResolveError::Config(format!(
                "YouTube API key not configured. Set {} or youtube_api_key in the TOML config.",
                YOUTUBE_API_KEY_ENV
            ))
        })
    }
}

/// Validate API key (non-empty, non-whitespace)
fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
