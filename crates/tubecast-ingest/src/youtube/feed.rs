//! Fallback listing backend: YouTube Atom feeds
//!
//! Quota-free `feeds/videos.xml` endpoint. Feeds only expose the most
//! recent ~15 entries, so this backend trades depth for availability,
//! which is what the provider needs when the Data API's budget is spent.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use tubecast_common::time::parse_upstream_timestamp;
use tubecast_common::types::{Channel, Video};

use super::{ListingBackend, ProviderError, ProviderResult};

/// Default feed host; overridable for tests.
pub const DEFAULT_FEED_BASE_URL: &str = "https://www.youtube.com";

/// Feeds carry at most ~15 entries; cap defensively anyway.
const MAX_FEED_ENTRIES: usize = 15;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Atom feed backend.
pub struct FeedBackend {
    client: reqwest::Client,
    base_url: String,
}

impl FeedBackend {
    pub fn new(base_url: &str) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("tubecast-ingest/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_feed(&self, query_key: &str, id: &str) -> ProviderResult<AtomFeed> {
        let url = format!("{}/feeds/videos.xml", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[(query_key, id)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(format!(
                "feed for {query_key}={id} returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::Network(format!(
                "feed for {query_key}={id} returned unexpected status {status}"
            )));
        }

        let body = response.text().await?;
        quick_xml::de::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))
    }

    fn videos_from_feed(feed: AtomFeed) -> Vec<Video> {
        feed.entries
            .into_iter()
            .take(MAX_FEED_ENTRIES)
            .filter_map(|entry| {
                let video_id = entry.video_id?;
                let channel_id = entry.channel_id?;
                let uploaded_at = entry
                    .published
                    .as_deref()
                    .and_then(parse_upstream_timestamp);
                Some(Video {
                    url: Some(Video::watch_url(&video_id)),
                    youtube_video_id: video_id,
                    title: entry.title,
                    description: entry.media.and_then(|m| m.description),
                    channel_id,
                    uploaded_at,
                    created_at: chrono::Utc::now(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<AtomAuthor>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
    #[serde(rename = "channelId", default)]
    channel_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    published: Option<String>,
    #[serde(rename = "group", default)]
    media: Option<MediaGroup>,
}

#[derive(Debug, Deserialize)]
struct MediaGroup {
    #[serde(rename = "description", default)]
    description: Option<String>,
}

#[async_trait]
impl ListingBackend for FeedBackend {
    async fn list_channel_videos(&self, channel_id: &str) -> ProviderResult<Vec<Video>> {
        let feed = self.fetch_feed("channel_id", channel_id).await?;
        let videos = Self::videos_from_feed(feed);
        debug!(channel_id, count = videos.len(), "listed channel videos via feed");
        Ok(videos)
    }

    async fn list_playlist_videos(&self, playlist_id: &str) -> ProviderResult<Vec<Video>> {
        let feed = self.fetch_feed("playlist_id", playlist_id).await?;
        let videos = Self::videos_from_feed(feed);
        debug!(playlist_id, count = videos.len(), "listed playlist videos via feed");
        Ok(videos)
    }

    async fn fetch_channel_info(&self, channel_id: &str) -> ProviderResult<Option<Channel>> {
        let feed = self.fetch_feed("channel_id", channel_id).await?;

        let title = feed
            .title
            .map(|t| t.replace("- YouTube", "").trim().to_string())
            .filter(|t| !t.is_empty());
        let author = feed.author.and_then(|a| a.name);

        if title.is_none() && author.is_none() {
            return Ok(None);
        }
        Ok(Some(Channel::new(channel_id, title, author)))
    }
}
