//! Caller-facing error taxonomy.
//!
//! "No metadata available" is a legitimate outcome and is expressed as an
//! absent result, never as an error. Cache write failures are logged at the
//! gateway and never surface here.

use crate::model::Service;
use crate::providers::ProviderError;
use crate::store::StoreError;
use thiserror::Error;

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors surfaced by the resolution engine.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The id fails the service's syntactic shape check. Caller error; no
    /// store or network call was made.
    #[error("invalid {service} video id: {id:?}")]
    InvalidVideoId { service: Service, id: String },

    /// The provider rejected the request because its usage allowance is
    /// exhausted. Distinct so callers can show an actionable message.
    #[error("provider API quota exhausted")]
    OutOfQuota,

    /// Generic transport or parse failure talking to a provider.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The adapter was asked for something it cannot express upstream,
    /// e.g. an empty field set.
    #[error("invalid provider request: {0}")]
    InvalidRequest(String),

    /// Metadata store read failure. Write failures are logged, not raised.
    #[error("metadata store error: {0}")]
    Store(#[from] StoreError),

    /// Missing or unusable configuration (e.g. no YouTube API key).
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ProviderError> for ResolveError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::OutOfQuota => ResolveError::OutOfQuota,
            ProviderError::Unavailable(msg) => ResolveError::ProviderUnavailable(msg),
            ProviderError::InvalidRequest(msg) => ResolveError::InvalidRequest(msg),
        }
    }
}
