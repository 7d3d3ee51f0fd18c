//! Primary listing backend: YouTube Data API v3
//!
//! Quota-limited JSON API. Channel listings are a single newest-first
//! search page; playlist listings paginate until the API stops handing out
//! page tokens. HTTP 403/429 are treated as quota exhaustion so the
//! provider can switch to the feed fallback.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use tubecast_common::time::parse_upstream_timestamp;
use tubecast_common::types::{Channel, Video};

use super::{ListingBackend, ProviderError, ProviderResult};

/// Default API endpoint; overridable for tests.
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Maximum results per API page.
const PAGE_SIZE: &str = "50";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// YouTube Data API v3 backend.
pub struct DataApiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl DataApiBackend {
    pub fn new(base_url: &str, api_key: Option<String>) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("tubecast-ingest/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn api_key(&self) -> ProviderResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::Unauthenticated("no API key configured for the Data API".to_string())
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ProviderResult<T> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        match status {
            s if s.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| ProviderError::Parse(e.to_string())),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Err(
                ProviderError::QuotaExceeded(format!("{path} returned {status}")),
            ),
            StatusCode::UNAUTHORIZED => Err(ProviderError::Unauthenticated(format!(
                "{path} returned {status}"
            ))),
            StatusCode::NOT_FOUND => {
                Err(ProviderError::NotFound(format!("{path} returned {status}")))
            },
            _ => Err(ProviderError::Network(format!(
                "{path} returned unexpected status {status}"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
    #[serde(rename = "resourceId")]
    resource_id: PlaylistResourceId,
}

#[derive(Debug, Deserialize)]
struct PlaylistResourceId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    snippet: Snippet,
}

fn build_video(
    video_id: String,
    channel_id: String,
    title: Option<String>,
    description: Option<String>,
    published_at: Option<&str>,
) -> Video {
    let uploaded_at = published_at.and_then(parse_upstream_timestamp);
    Video {
        url: Some(Video::watch_url(&video_id)),
        youtube_video_id: video_id,
        title,
        description,
        channel_id,
        uploaded_at,
        created_at: chrono::Utc::now(),
    }
}

#[async_trait]
impl ListingBackend for DataApiBackend {
    async fn list_channel_videos(&self, channel_id: &str) -> ProviderResult<Vec<Video>> {
        let key = self.api_key()?;
        let response: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id),
                    ("order", "date"),
                    ("type", "video"),
                    ("maxResults", PAGE_SIZE),
                    ("key", key),
                ],
            )
            .await?;

        let videos: Vec<Video> = response
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(build_video(
                    video_id,
                    channel_id.to_string(),
                    item.snippet.title,
                    item.snippet.description,
                    item.snippet.published_at.as_deref(),
                ))
            })
            .collect();

        debug!(channel_id, count = videos.len(), "listed channel videos via Data API");
        Ok(videos)
    }

    async fn list_playlist_videos(&self, playlist_id: &str) -> ProviderResult<Vec<Video>> {
        let key = self.api_key()?.to_string();
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("part", "snippet".to_string()),
                ("playlistId", playlist_id.to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
                ("key", key.clone()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let query: Vec<(&str, &str)> =
                query.iter().map(|(k, v)| (*k, v.as_str())).collect();

            let response: PlaylistItemsResponse =
                self.get_json("playlistItems", &query).await?;

            for item in response.items {
                let snippet = item.snippet;
                let Some(video_id) = snippet.resource_id.video_id else {
                    continue;
                };
                // Playlist items name the uploader channel in the snippet.
                let Some(channel_id) = snippet.channel_id else {
                    continue;
                };
                videos.push(build_video(
                    video_id,
                    channel_id,
                    snippet.title,
                    snippet.description,
                    snippet.published_at.as_deref(),
                ));
            }

            page_token = response.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        debug!(playlist_id, count = videos.len(), "listed playlist videos via Data API");
        Ok(videos)
    }

    async fn fetch_channel_info(&self, channel_id: &str) -> ProviderResult<Option<Channel>> {
        let key = self.api_key()?;
        let response: ChannelListResponse = self
            .get_json(
                "channels",
                &[("part", "snippet"), ("id", channel_id), ("key", key)],
            )
            .await?;

        Ok(response.items.into_iter().next().map(|item| {
            Channel::new(channel_id, item.snippet.title, item.snippet.description)
        }))
    }
}
