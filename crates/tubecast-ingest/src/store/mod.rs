//! Record store abstraction
//!
//! The ingestion engine talks to persistence through the [`Store`] trait so
//! it can run against the Postgres-backed [`postgres::PgStore`] in
//! production and the in-process [`memory::MemoryStore`] in tests and local
//! development. Absence is always `Ok(None)`, distinct from a backend
//! failure; inserts on natural-keyed entities are upsert-safe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use tubecast_common::types::{
    Channel, GenerationJob, Source, SourceChannel, SourceVideo, User, Video,
};

pub mod memory;
pub mod postgres;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error types for the record store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record that must exist for the operation to make sense is absent.
    /// Plain lookups report absence as `Ok(None)` instead.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The backend rejected the call because its rate budget is spent.
    /// Batch processing retries these after a cooldown.
    #[error("store rate limited: {0}")]
    RateLimited(String),

    /// Any other backend failure (transport, constraint, serialization).
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Persistence operations consumed by the ingestion engine.
///
/// Bulk inserts have upsert semantics: create-if-absent, refresh basic
/// fields if present, never fail on a duplicate natural key and never
/// create a duplicate row.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>>;

    async fn get_sources_by_user(&self, user_id: &str) -> StoreResult<Vec<Source>>;

    /// Member-channel links of a channel-collection source.
    async fn get_source_channels(&self, source_id: Uuid) -> StoreResult<Vec<SourceChannel>>;

    async fn get_channel(&self, youtube_channel_id: &str) -> StoreResult<Option<Channel>>;

    async fn insert_channel(&self, channel: &Channel) -> StoreResult<Channel>;

    async fn bulk_insert_channels(&self, channels: &[Channel]) -> StoreResult<Vec<Channel>>;

    async fn get_video(&self, youtube_video_id: &str) -> StoreResult<Option<Video>>;

    async fn insert_video(&self, video: &Video) -> StoreResult<Video>;

    /// Upsert a batch of videos, returning the stored records.
    ///
    /// Existing rows keep their upload and first-seen timestamps; only
    /// title, description and url are refreshed.
    async fn bulk_insert_videos(&self, videos: &[Video]) -> StoreResult<Vec<Video>>;

    async fn get_source_video(
        &self,
        source_id: Uuid,
        youtube_video_id: &str,
    ) -> StoreResult<Option<SourceVideo>>;

    async fn insert_source_video(&self, link: &SourceVideo) -> StoreResult<SourceVideo>;

    async fn bulk_insert_source_videos(
        &self,
        links: &[SourceVideo],
    ) -> StoreResult<Vec<SourceVideo>>;

    async fn insert_generation_job(&self, job: &GenerationJob) -> StoreResult<GenerationJob>;

    /// Advance a source's `last_processed_at` checkpoint.
    ///
    /// Errors with [`StoreError::NotFound`] when the source is gone.
    async fn update_source_checkpoint(
        &self,
        source_id: Uuid,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<Source>;
}
