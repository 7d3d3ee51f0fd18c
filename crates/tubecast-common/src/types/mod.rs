//! Domain types shared across the tubecast workspace
//!
//! All entities are owned by the record store; the ingestion engine only
//! holds them transiently during a run. Natural keys (YouTube channel and
//! video ids) back the upsert semantics of the store layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A registered user whose sources are monitored.
///
/// Created and mutated by the account layer; the ingestion engine only
/// reads it. The OAuth refresh token is managed by the credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// External account identifier
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    /// OAuth refresh token, when the user granted API access
    pub refresh_token: Option<String>,
    /// Expiry of the last issued access token
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A YouTube channel known to the catalog.
///
/// `youtube_channel_id` is the natural key. Title and description are
/// refreshed on upsert; everything else is immutable after first insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub youtube_channel_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub channel_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Channel {
    /// Build a channel record from upstream metadata.
    pub fn new(
        youtube_channel_id: impl Into<String>,
        title: Option<String>,
        description: Option<String>,
    ) -> Self {
        let youtube_channel_id = youtube_channel_id.into();
        let channel_url = Some(format!(
            "https://www.youtube.com/channel/{youtube_channel_id}"
        ));
        Self {
            youtube_channel_id,
            title,
            description,
            channel_url,
            created_at: Utc::now(),
        }
    }
}

/// Kind of monitoring target a source represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A set of member channels, linked through `SourceChannel` rows
    ChannelCollection,
    /// A single upstream playlist
    Playlist,
}

impl SourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            SourceKind::ChannelCollection => "channel_collection",
            SourceKind::Playlist => "playlist",
        }
    }
}

impl From<String> for SourceKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "playlist" => SourceKind::Playlist,
            _ => SourceKind::ChannelCollection,
        }
    }
}

/// A user-owned monitoring target.
///
/// `last_processed_at` is the ingestion checkpoint: the upload-time boundary
/// below which videos are considered already handled. It is null until the
/// first successful run and advances only after a generation job for the
/// source has been durably queued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub user_id: String,
    pub kind: SourceKind,
    pub name: String,
    /// Required iff `kind` is `Playlist`
    pub youtube_playlist_id: Option<String>,
    /// Opaque pass-through configuration, copied verbatim into jobs
    #[serde(default)]
    pub preferences: Map<String, Value>,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Membership link between a channel-collection source and a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChannel {
    pub source_id: Uuid,
    pub youtube_channel_id: String,
}

/// A video in the shared catalog.
///
/// Videos are catalog entries shared across sources and users, not
/// per-source copies. `uploaded_at` comes from upstream and may be absent
/// for malformed listings; `created_at` is the first-seen timestamp. Upsert
/// refreshes title/description/url only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub youtube_video_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    /// Owning YouTube channel id
    pub channel_id: String,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Canonical watch URL for a video id.
    pub fn watch_url(youtube_video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={youtube_video_id}")
    }
}

/// Link recording that a video is relevant to a source.
///
/// `processed_at` stays null until the downstream consumer folds the video
/// into produced output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceVideo {
    pub source_id: Uuid,
    pub youtube_video_id: String,
    pub processed_at: Option<DateTime<Utc>>,
}

impl SourceVideo {
    pub fn new(source_id: Uuid, youtube_video_id: impl Into<String>) -> Self {
        Self {
            source_id,
            youtube_video_id: youtube_video_id.into(),
            processed_at: None,
        }
    }
}

/// Generation job lifecycle status.
///
/// The engine only ever creates jobs in `Queued`; all later transitions
/// belong to the downstream consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PROCESSING" => JobStatus::Processing,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed,
            _ => JobStatus::Queued,
        }
    }
}

/// Payload handed to the downstream consumer inside a job's config.
///
/// This is the wire contract: consumers recover exactly
/// `{ video_ids, source_id, preferences }` from the job's
/// `config.processing_options`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub video_ids: Vec<String>,
    pub source_id: Uuid,
    /// The owning source's preferences map, copied verbatim
    #[serde(default)]
    pub preferences: Map<String, Value>,
}

/// Configuration payload of a generation job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub model_parameters: Map<String, Value>,
    #[serde(default)]
    pub processing_options: Option<ProcessingOptions>,
}

impl JobConfig {
    pub fn for_processing(options: ProcessingOptions) -> Self {
        Self {
            model_parameters: Map::new(),
            processing_options: Some(options),
        }
    }
}

/// Unit of work handed to the downstream (out-of-scope) consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: Uuid,
    pub user_id: String,
    pub source_id: Option<Uuid>,
    pub status: JobStatus,
    pub config: JobConfig,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    /// Build a freshly queued job for a source.
    pub fn queued(user_id: impl Into<String>, source_id: Uuid, config: JobConfig) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            source_id: Some(source_id),
            status: JobStatus::Queued,
            config,
            error_message: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_round_trip() {
        assert_eq!(
            SourceKind::from("channel_collection".to_string()),
            SourceKind::ChannelCollection
        );
        assert_eq!(
            SourceKind::from("playlist".to_string()),
            SourceKind::Playlist
        );
        assert_eq!(SourceKind::Playlist.as_str(), "playlist");
    }

    #[test]
    fn test_job_status_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::from(status.as_str().to_string()), status);
        }
    }

    #[test]
    fn test_processing_options_wire_shape() {
        let source_id = Uuid::new_v4();
        let mut preferences = Map::new();
        preferences.insert("tts_voice".into(), Value::String("en-GB".into()));

        let config = JobConfig::for_processing(ProcessingOptions {
            video_ids: vec!["abc123".into(), "def456".into()],
            source_id,
            preferences,
        });

        let value = serde_json::to_value(&config).unwrap();
        let options = &value["processing_options"];
        assert_eq!(options["video_ids"][0], "abc123");
        assert_eq!(options["source_id"], source_id.to_string());
        assert_eq!(options["preferences"]["tts_voice"], "en-GB");
    }

    #[test]
    fn test_queued_job_defaults() {
        let source_id = Uuid::new_v4();
        let job = GenerationJob::queued("user-1", source_id, JobConfig::default());

        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.source_id, Some(source_id));
        assert!(job.started_at.is_none());
        assert!(job.error_message.is_none());
    }
}
