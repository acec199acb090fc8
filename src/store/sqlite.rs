//! SQLite-backed metadata store.
//!
//! One row per (service, id). Columns are nullable so a row can hold any
//! subset of the schema. The upsert COALESCEs each incoming column with the
//! stored one, which enforces the merge invariant at the storage layer:
//! concurrent resolutions for the same identity may both write, and the row
//! converges to the field-wise union regardless of write order.

use super::{MetadataStore, StoreError};
use crate::model::{Service, Video};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS videos (
    service     TEXT NOT NULL,
    id          TEXT NOT NULL,
    title       TEXT,
    description TEXT,
    thumbnail   TEXT,
    length      INTEGER,
    fetched_at  TEXT NOT NULL,
    PRIMARY KEY (service, id)
)";

const UPSERT: &str = "
INSERT INTO videos (service, id, title, description, thumbnail, length, fetched_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT (service, id) DO UPDATE SET
    title       = COALESCE(excluded.title, videos.title),
    description = COALESCE(excluded.description, videos.description),
    thumbnail   = COALESCE(excluded.thumbnail, videos.thumbnail),
    length      = COALESCE(excluded.length, videos.length),
    fetched_at  = excluded.fetched_at";

const SELECT_ONE: &str = "
SELECT service, id, title, description, thumbnail, length
FROM videos WHERE service = ?1 AND id = ?2";

// Keys per IN-list query: two bind parameters each, well under SQLite's
// bound-variable limit.
const MAX_KEYS_PER_QUERY: usize = 200;

/// Persistent store over a SQLite connection pool.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) a store at the given database path.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self::with_pool(pool).await?;
        info!(path = %path.as_ref().display(), "metadata store opened");
        Ok(store)
    }

    /// In-memory store, useful for tests. A single connection keeps the
    /// database alive for the pool's lifetime.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if needed.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_video(row: &SqliteRow) -> Result<Video, StoreError> {
        let service_str: String = row.try_get("service")?;
        let service = Service::from_str(&service_str)
            .map_err(|e| StoreError::Internal(format!("corrupt row: {}", e)))?;
        let length: Option<i64> = row.try_get("length")?;
        Ok(Video {
            service,
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            thumbnail: row.try_get("thumbnail")?,
            length: length.and_then(|n| u32::try_from(n).ok()),
        })
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn get(&self, service: Service, id: &str) -> Result<Option<Video>, StoreError> {
        let row = sqlx::query(SELECT_ONE)
            .bind(service.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_video).transpose()
    }

    async fn get_batch(
        &self,
        keys: &[(Service, String)],
    ) -> Result<Vec<Option<Video>>, StoreError> {
        let mut found: HashMap<(Service, String), Video> = HashMap::new();
        for chunk in keys.chunks(MAX_KEYS_PER_QUERY) {
            let values = (0..chunk.len())
                .map(|i| format!("(?{}, ?{})", 2 * i + 1, 2 * i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT service, id, title, description, thumbnail, length \
                 FROM videos WHERE (service, id) IN (VALUES {})",
                values
            );
            let mut query = sqlx::query(&sql);
            for (service, id) in chunk {
                query = query.bind(service.as_str()).bind(id);
            }
            for row in query.fetch_all(&self.pool).await? {
                let video = Self::row_to_video(&row)?;
                found.insert((video.service, video.id.clone()), video);
            }
        }
        Ok(keys
            .iter()
            .map(|(service, id)| found.get(&(*service, id.clone())).cloned())
            .collect())
    }

    async fn put(&self, video: &Video) -> Result<(), StoreError> {
        sqlx::query(UPSERT)
            .bind(video.service.as_str())
            .bind(&video.id)
            .bind(&video.title)
            .bind(&video.description)
            .bind(&video.thumbnail)
            .bind(video.length.map(i64::from))
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn put_batch(&self, videos: &[Video]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let fetched_at = Utc::now().to_rfc3339();
        for video in videos {
            sqlx::query(UPSERT)
                .bind(video.service.as_str())
                .bind(&video.id)
                .bind(&video.title)
                .bind(&video.description)
                .bind(&video.thumbnail)
                .bind(video.length.map(i64::from))
                .bind(&fetched_at)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
