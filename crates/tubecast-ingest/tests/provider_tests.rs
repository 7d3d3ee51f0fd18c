//! Listing backend tests against a mock HTTP server.

use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tubecast_ingest::youtube::data_api::DataApiBackend;
use tubecast_ingest::youtube::feed::FeedBackend;
use tubecast_ingest::youtube::{
    ListingBackend, ProviderError, SourceProvider, VideoProvider,
};

fn search_response() -> serde_json::Value {
    json!({
        "kind": "youtube#searchListResponse",
        "items": [
            {
                "id": { "kind": "youtube#video", "videoId": "api-v1" },
                "snippet": {
                    "publishedAt": "2024-05-01T10:00:00Z",
                    "channelId": "UC1",
                    "title": "first",
                    "description": "first description"
                }
            },
            {
                "id": { "kind": "youtube#video", "videoId": "api-v2" },
                "snippet": {
                    "publishedAt": "2024-05-02T10:00:00Z",
                    "channelId": "UC1",
                    "title": "second",
                    "description": "second description"
                }
            }
        ]
    })
}

fn channel_feed_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015"
      xmlns:media="http://search.yahoo.com/mrss/"
      xmlns="http://www.w3.org/2005/Atom">
  <title>Example Channel - YouTube</title>
  <author>
    <name>Example Channel</name>
    <uri>https://www.youtube.com/channel/UC1</uri>
  </author>
  <entry>
    <id>yt:video:feed-v1</id>
    <yt:videoId>feed-v1</yt:videoId>
    <yt:channelId>UC1</yt:channelId>
    <title>Feed upload</title>
    <published>2024-05-03T09:00:00+00:00</published>
    <media:group>
      <media:description>from the feed</media:description>
    </media:group>
  </entry>
</feed>"#
        .to_string()
}

fn api_backend(server: &MockServer) -> DataApiBackend {
    DataApiBackend::new(&server.uri(), Some("test-key".to_string())).unwrap()
}

fn feed_backend(server: &MockServer) -> FeedBackend {
    FeedBackend::new(&server.uri()).unwrap()
}

// ---------------------------------------------------------------------------
// Data API backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_api_channel_listing_parses_videos() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("channelId", "UC1"))
        .and(query_param("order", "date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response()))
        .mount(&server)
        .await;

    let videos = api_backend(&server)
        .list_channel_videos("UC1")
        .await
        .unwrap();

    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0].youtube_video_id, "api-v1");
    assert_eq!(videos[0].channel_id, "UC1");
    assert_eq!(
        videos[0].uploaded_at,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
    );
    assert_eq!(videos[1].title.as_deref(), Some("second"));
}

#[tokio::test]
async fn test_api_playlist_listing_paginates() {
    let server = MockServer::start().await;

    // Specific page-token mock first so it wins for the second request.
    Mock::given(method("GET"))
        .and(path("/playlistItems"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "snippet": {
                        "publishedAt": "2024-05-02T10:00:00Z",
                        "channelId": "UC1",
                        "title": "second",
                        "resourceId": { "videoId": "pl-v2" }
                    }
                }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/playlistItems"))
        .and(query_param("playlistId", "PL1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "snippet": {
                        "publishedAt": "2024-05-01T10:00:00Z",
                        "channelId": "UC1",
                        "title": "first",
                        "resourceId": { "videoId": "pl-v1" }
                    }
                }
            ],
            "nextPageToken": "page-2"
        })))
        .mount(&server)
        .await;

    let videos = api_backend(&server)
        .list_playlist_videos("PL1")
        .await
        .unwrap();

    let ids: Vec<&str> = videos.iter().map(|v| v.youtube_video_id.as_str()).collect();
    assert_eq!(ids, vec!["pl-v1", "pl-v2"]);
}

#[tokio::test]
async fn test_api_quota_status_maps_to_quota_exceeded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = api_backend(&server)
        .list_channel_videos("UC1")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::QuotaExceeded(_)));
}

#[tokio::test]
async fn test_api_without_key_is_unauthenticated() {
    let server = MockServer::start().await;
    let backend = DataApiBackend::new(&server.uri(), None).unwrap();

    let err = backend.list_channel_videos("UC1").await.unwrap_err();
    assert!(matches!(err, ProviderError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_api_channel_info_absent_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let info = api_backend(&server)
        .fetch_channel_info("UC-gone")
        .await
        .unwrap();
    assert!(info.is_none());
}

// ---------------------------------------------------------------------------
// Feed backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_feed_channel_listing_parses_atom() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feeds/videos.xml"))
        .and(query_param("channel_id", "UC1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(channel_feed_xml(), "application/atom+xml"),
        )
        .mount(&server)
        .await;

    let videos = feed_backend(&server)
        .list_channel_videos("UC1")
        .await
        .unwrap();

    assert_eq!(videos.len(), 1);
    let video = &videos[0];
    assert_eq!(video.youtube_video_id, "feed-v1");
    assert_eq!(video.channel_id, "UC1");
    assert_eq!(video.title.as_deref(), Some("Feed upload"));
    assert_eq!(video.description.as_deref(), Some("from the feed"));
    assert_eq!(
        video.uploaded_at,
        Some(Utc.with_ymd_and_hms(2024, 5, 3, 9, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn test_feed_channel_info_strips_suffix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feeds/videos.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(channel_feed_xml(), "application/atom+xml"),
        )
        .mount(&server)
        .await;

    let info = feed_backend(&server)
        .fetch_channel_info("UC1")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(info.title.as_deref(), Some("Example Channel"));
    assert_eq!(info.description.as_deref(), Some("Example Channel"));
    assert_eq!(info.youtube_channel_id, "UC1");
}

// ---------------------------------------------------------------------------
// Dual-backend provider
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_quota_exhaustion_falls_back_to_feed() {
    let server = MockServer::start().await;

    // Primary is out of budget; the fallback feed still answers.
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feeds/videos.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(channel_feed_xml(), "application/atom+xml"),
        )
        .mount(&server)
        .await;

    let provider =
        SourceProvider::new(api_backend(&server), feed_backend(&server));

    let videos = provider.fetch_channel_videos("UC1").await.unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].youtube_video_id, "feed-v1");
}

#[tokio::test]
async fn test_transient_backend_failure_degrades_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider =
        SourceProvider::new(api_backend(&server), feed_backend(&server));

    let videos = provider.fetch_channel_videos("UC1").await.unwrap();
    assert!(videos.is_empty());
}

#[tokio::test]
async fn test_missing_credential_surfaces_to_caller() {
    let server = MockServer::start().await;
    let provider = SourceProvider::new(
        DataApiBackend::new(&server.uri(), None).unwrap(),
        feed_backend(&server),
    );

    let err = provider.fetch_channel_videos("UC1").await.unwrap_err();
    assert!(matches!(err, ProviderError::Unauthenticated(_)));
}
