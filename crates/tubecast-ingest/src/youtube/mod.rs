//! Video listing provider
//!
//! Two interchangeable listing backends behind one interface: the
//! quota-limited Data API ([`data_api::DataApiBackend`]) and the quota-free
//! Atom feed endpoint ([`feed::FeedBackend`]). [`SourceProvider`] composes
//! a primary and a fallback backend and is what the ingestion engine talks
//! to; it branches only on results, never on backend type.
//!
//! The provider is a pure read-through adapter: it never touches the
//! record store, and apart from the quota fallback it does not retry.
//! Retry policy belongs to the engine.

use async_trait::async_trait;
use tracing::{error, warn};

use tubecast_common::types::{Channel, Video};

pub mod data_api;
pub mod feed;

pub use data_api::DataApiBackend;
pub use feed::FeedBackend;

use crate::config::MonitorConfig;

/// Result type for provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Error types for the listing backends
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The backend's rate budget for the current window is spent.
    #[error("upstream quota exhausted: {0}")]
    QuotaExceeded(String),

    /// The requested channel/playlist does not exist upstream.
    #[error("upstream entity not found: {0}")]
    NotFound(String),

    /// Transport-level failure; transient, not retried at this layer.
    #[error("upstream network error: {0}")]
    Network(String),

    /// The backend returned a payload we could not decode.
    #[error("malformed upstream payload: {0}")]
    Parse(String),

    /// Missing or rejected credential. Fatal for the call.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

/// A single video-listing backend.
///
/// Implementations report failures through the full [`ProviderError`]
/// taxonomy; degradation decisions (fallback, empty results) live in
/// [`SourceProvider`].
#[async_trait]
pub trait ListingBackend: Send + Sync {
    /// Newest-first videos for a channel, capped at the backend's page size.
    async fn list_channel_videos(&self, channel_id: &str) -> ProviderResult<Vec<Video>>;

    /// All available videos of a playlist.
    async fn list_playlist_videos(&self, playlist_id: &str) -> ProviderResult<Vec<Video>>;

    /// Display metadata for a channel; `Ok(None)` when it cannot be resolved.
    async fn fetch_channel_info(&self, channel_id: &str) -> ProviderResult<Option<Channel>>;
}

/// Engine-facing listing contract.
///
/// Fetch failures for one channel/playlist must not abort a whole run, so
/// every operation degrades to an empty/absent result instead of erroring,
/// with two exceptions: [`ProviderError::Unauthenticated`] is surfaced to
/// the caller, and a quota signal from the primary backend is absorbed by
/// transparently consulting the fallback.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    async fn fetch_channel_videos(&self, channel_id: &str) -> ProviderResult<Vec<Video>>;

    async fn fetch_playlist_videos(&self, playlist_id: &str) -> ProviderResult<Vec<Video>>;

    async fn fetch_channel_info(&self, channel_id: &str) -> ProviderResult<Option<Channel>>;
}

/// Dual-backend provider: primary Data API, quota-free feed fallback.
pub struct SourceProvider<P = DataApiBackend, F = FeedBackend> {
    primary: P,
    fallback: F,
}

impl SourceProvider {
    /// Wire up the production backends from configuration.
    pub fn from_config(config: &MonitorConfig) -> ProviderResult<Self> {
        Ok(Self {
            primary: DataApiBackend::new(&config.api_base_url, config.api_key.clone())?,
            fallback: FeedBackend::new(&config.feed_base_url)?,
        })
    }
}

impl<P, F> SourceProvider<P, F>
where
    P: ListingBackend,
    F: ListingBackend,
{
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    /// Absorb a primary-backend quota signal by re-issuing the listing
    /// against the fallback; everything else degrades to `default`.
    async fn with_fallback<T, Fut>(
        &self,
        what: &str,
        id: &str,
        primary_result: ProviderResult<T>,
        fallback_call: impl FnOnce() -> Fut,
        default: T,
    ) -> ProviderResult<T>
    where
        Fut: std::future::Future<Output = ProviderResult<T>>,
    {
        match primary_result {
            Ok(value) => Ok(value),
            Err(ProviderError::Unauthenticated(reason)) => {
                Err(ProviderError::Unauthenticated(reason))
            },
            Err(ProviderError::QuotaExceeded(reason)) => {
                warn!(%what, %id, %reason, "primary backend quota exhausted, using feed fallback");
                match fallback_call().await {
                    Ok(value) => Ok(value),
                    Err(err) => {
                        error!(%what, %id, error = %err, "fallback backend failed");
                        Ok(default)
                    },
                }
            },
            Err(ProviderError::NotFound(reason)) => {
                warn!(%what, %id, %reason, "entity not found upstream");
                Ok(default)
            },
            Err(err) => {
                error!(%what, %id, error = %err, "listing fetch failed");
                Ok(default)
            },
        }
    }
}

#[async_trait]
impl<P, F> VideoProvider for SourceProvider<P, F>
where
    P: ListingBackend,
    F: ListingBackend,
{
    async fn fetch_channel_videos(&self, channel_id: &str) -> ProviderResult<Vec<Video>> {
        let primary = self.primary.list_channel_videos(channel_id).await;
        self.with_fallback(
            "channel_videos",
            channel_id,
            primary,
            || self.fallback.list_channel_videos(channel_id),
            Vec::new(),
        )
        .await
    }

    async fn fetch_playlist_videos(&self, playlist_id: &str) -> ProviderResult<Vec<Video>> {
        let primary = self.primary.list_playlist_videos(playlist_id).await;
        self.with_fallback(
            "playlist_videos",
            playlist_id,
            primary,
            || self.fallback.list_playlist_videos(playlist_id),
            Vec::new(),
        )
        .await
    }

    async fn fetch_channel_info(&self, channel_id: &str) -> ProviderResult<Option<Channel>> {
        let primary = self.primary.fetch_channel_info(channel_id).await;
        self.with_fallback(
            "channel_info",
            channel_id,
            primary,
            || self.fallback.fetch_channel_info(channel_id),
            None,
        )
        .await
    }
}
