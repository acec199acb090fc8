//! vidmeta — video metadata resolution with a partial-field cache.
//!
//! Resolves display metadata (title, description, thumbnail, duration) for
//! videos named by a (service, id) pair, fetching from YouTube, Vimeo, or
//! Dailymotion while minimizing calls to their rate-limited APIs: the
//! engine consults a persistent partial-field cache, fetches only what is
//! missing, batches requests that need exactly the same fields, and merges
//! results back into cache-shaped records in the caller's original order.
//!
//! # Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use vidmeta::{Config, ResolutionEngine, Service, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::connect("videos.db").await?);
//! let engine = ResolutionEngine::from_config(store, &Config::load(path)?)?;
//!
//! let video = engine.resolve_one(Service::Youtube, "dQw4w9WgXcQ").await?;
//! let batch = engine
//!     .resolve_many(&[(Service::Youtube, "dQw4w9WgXcQ".into()),
//!                     (Service::Vimeo, "76979871".into())])
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod providers;
pub mod store;

pub use cache::CacheGateway;
pub use config::Config;
pub use engine::ResolutionEngine;
pub use error::{ResolveError, Result};
pub use model::{Field, FieldSet, Service, Video};
pub use providers::{
    DailymotionProvider, ProviderError, VideoProvider, VimeoProvider, YouTubeProvider,
};
pub use store::{MemoryStore, MetadataStore, SqliteStore, StoreError};
