//! In-memory record store
//!
//! Hash-map backed [`Store`] implementation with the same upsert semantics
//! as the Postgres store. Used by the test suite and handy for local
//! development without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use tubecast_common::types::{
    Channel, GenerationJob, Source, SourceChannel, SourceVideo, User, Video,
};

use super::{Store, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    channels: HashMap<String, Channel>,
    sources: HashMap<Uuid, Source>,
    source_channels: Vec<SourceChannel>,
    videos: HashMap<String, Video>,
    source_videos: HashMap<(Uuid, String), SourceVideo>,
    jobs: HashMap<Uuid, GenerationJob>,
}

/// In-memory [`Store`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user (test/dev helper; user lifecycle is external to the engine).
    pub async fn seed_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id.clone(), user);
    }

    /// Seed a source (test/dev helper; source lifecycle is external to the engine).
    pub async fn seed_source(&self, source: Source) {
        self.inner.write().await.sources.insert(source.id, source);
    }

    /// Link a channel into a channel-collection source (test/dev helper).
    pub async fn seed_source_channel(&self, source_id: Uuid, youtube_channel_id: &str) {
        let mut inner = self.inner.write().await;
        let exists = inner
            .source_channels
            .iter()
            .any(|sc| sc.source_id == source_id && sc.youtube_channel_id == youtube_channel_id);
        if !exists {
            inner.source_channels.push(SourceChannel {
                source_id,
                youtube_channel_id: youtube_channel_id.to_string(),
            });
        }
    }

    /// Read a source back, checkpoint included.
    pub async fn get_source(&self, source_id: Uuid) -> Option<Source> {
        self.inner.read().await.sources.get(&source_id).cloned()
    }

    /// All source->video links for a source, in no particular order.
    pub async fn source_videos_for(&self, source_id: Uuid) -> Vec<SourceVideo> {
        self.inner
            .read()
            .await
            .source_videos
            .values()
            .filter(|sv| sv.source_id == source_id)
            .cloned()
            .collect()
    }

    /// Number of catalog video rows.
    pub async fn video_count(&self) -> usize {
        self.inner.read().await.videos.len()
    }

    /// Number of persisted jobs.
    pub async fn job_count(&self) -> usize {
        self.inner.read().await.jobs.len()
    }
}

fn upsert_channel(inner: &mut Inner, channel: &Channel) -> Channel {
    match inner.channels.get_mut(&channel.youtube_channel_id) {
        Some(stored) => {
            stored.title = channel.title.clone();
            stored.description = channel.description.clone();
            stored.clone()
        },
        None => {
            inner
                .channels
                .insert(channel.youtube_channel_id.clone(), channel.clone());
            channel.clone()
        },
    }
}

fn upsert_video(inner: &mut Inner, video: &Video) -> Video {
    match inner.videos.get_mut(&video.youtube_video_id) {
        Some(stored) => {
            // Basic fields refresh; upload and first-seen timestamps stay.
            stored.title = video.title.clone();
            stored.description = video.description.clone();
            stored.url = video.url.clone();
            stored.clone()
        },
        None => {
            inner
                .videos
                .insert(video.youtube_video_id.clone(), video.clone());
            video.clone()
        },
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
    }

    async fn get_sources_by_user(&self, user_id: &str) -> StoreResult<Vec<Source>> {
        let inner = self.inner.read().await;
        let mut sources: Vec<Source> = inner
            .sources
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sources.sort_by_key(|s| s.created_at);
        Ok(sources)
    }

    async fn get_source_channels(&self, source_id: Uuid) -> StoreResult<Vec<SourceChannel>> {
        Ok(self
            .inner
            .read()
            .await
            .source_channels
            .iter()
            .filter(|sc| sc.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn get_channel(&self, youtube_channel_id: &str) -> StoreResult<Option<Channel>> {
        Ok(self
            .inner
            .read()
            .await
            .channels
            .get(youtube_channel_id)
            .cloned())
    }

    async fn insert_channel(&self, channel: &Channel) -> StoreResult<Channel> {
        let mut inner = self.inner.write().await;
        Ok(upsert_channel(&mut inner, channel))
    }

    async fn bulk_insert_channels(&self, channels: &[Channel]) -> StoreResult<Vec<Channel>> {
        let mut inner = self.inner.write().await;
        Ok(channels
            .iter()
            .map(|c| upsert_channel(&mut inner, c))
            .collect())
    }

    async fn get_video(&self, youtube_video_id: &str) -> StoreResult<Option<Video>> {
        Ok(self
            .inner
            .read()
            .await
            .videos
            .get(youtube_video_id)
            .cloned())
    }

    async fn insert_video(&self, video: &Video) -> StoreResult<Video> {
        let mut inner = self.inner.write().await;
        Ok(upsert_video(&mut inner, video))
    }

    async fn bulk_insert_videos(&self, videos: &[Video]) -> StoreResult<Vec<Video>> {
        let mut inner = self.inner.write().await;
        Ok(videos.iter().map(|v| upsert_video(&mut inner, v)).collect())
    }

    async fn get_source_video(
        &self,
        source_id: Uuid,
        youtube_video_id: &str,
    ) -> StoreResult<Option<SourceVideo>> {
        Ok(self
            .inner
            .read()
            .await
            .source_videos
            .get(&(source_id, youtube_video_id.to_string()))
            .cloned())
    }

    async fn insert_source_video(&self, link: &SourceVideo) -> StoreResult<SourceVideo> {
        let mut inner = self.inner.write().await;
        let key = (link.source_id, link.youtube_video_id.clone());
        Ok(inner
            .source_videos
            .entry(key)
            .or_insert_with(|| link.clone())
            .clone())
    }

    async fn bulk_insert_source_videos(
        &self,
        links: &[SourceVideo],
    ) -> StoreResult<Vec<SourceVideo>> {
        let mut inner = self.inner.write().await;
        Ok(links
            .iter()
            .map(|link| {
                let key = (link.source_id, link.youtube_video_id.clone());
                inner
                    .source_videos
                    .entry(key)
                    .or_insert_with(|| link.clone())
                    .clone()
            })
            .collect())
    }

    async fn insert_generation_job(&self, job: &GenerationJob) -> StoreResult<GenerationJob> {
        let mut inner = self.inner.write().await;
        inner.jobs.insert(job.id, job.clone());
        Ok(job.clone())
    }

    async fn update_source_checkpoint(
        &self,
        source_id: Uuid,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<Source> {
        let mut inner = self.inner.write().await;
        match inner.sources.get_mut(&source_id) {
            Some(source) => {
                source.last_processed_at = Some(processed_at);
                Ok(source.clone())
            },
            None => Err(StoreError::NotFound(format!("source {source_id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubecast_common::types::JobConfig;

    fn video(id: &str) -> Video {
        Video {
            youtube_video_id: id.to_string(),
            title: Some(format!("video {id}")),
            description: None,
            url: Some(Video::watch_url(id)),
            channel_id: "UC1".to_string(),
            uploaded_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_video_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let first = video("v1");

        store.insert_video(&first).await.unwrap();
        let mut refetched = video("v1");
        refetched.title = Some("renamed".to_string());
        let stored = store.insert_video(&refetched).await.unwrap();

        assert_eq!(store.video_count().await, 1);
        assert_eq!(stored.title.as_deref(), Some("renamed"));
        // First-seen timestamp survives the re-insert.
        assert_eq!(stored.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_source_video_links_do_not_duplicate() {
        let store = MemoryStore::new();
        let source_id = Uuid::new_v4();
        let link = SourceVideo::new(source_id, "v1");

        store.insert_source_video(&link).await.unwrap();
        store.insert_source_video(&link).await.unwrap();
        store.bulk_insert_source_videos(&[link]).await.unwrap();

        assert_eq!(store.source_videos_for(source_id).await.len(), 1);
        let stored = store.get_source_video(source_id, "v1").await.unwrap();
        assert!(stored.is_some_and(|sv| sv.processed_at.is_none()));
    }

    #[tokio::test]
    async fn test_checkpoint_update_missing_source() {
        let store = MemoryStore::new();
        let err = store
            .update_source_checkpoint(Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_job_insert_round_trip() {
        let store = MemoryStore::new();
        let job = GenerationJob::queued("u1", Uuid::new_v4(), JobConfig::default());
        let stored = store.insert_generation_job(&job).await.unwrap();
        assert_eq!(stored.id, job.id);
        assert_eq!(store.job_count().await, 1);
    }
}
