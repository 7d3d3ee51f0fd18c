//! Channel monitor engine
//!
//! Per-run state machine: resolve user and sources, fan out channel or
//! playlist listings, merge fetched videos into the shared catalog, filter
//! through the inclusion policy, persist in batches with bounded retry,
//! link videos to the source and enqueue exactly one generation job; then,
//! and only then, advance the source checkpoint. A crash between job
//! insert and checkpoint update can re-send already queued videos on the
//! next run; it can never lose them.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use tubecast_common::types::{
    GenerationJob, JobConfig, ProcessingOptions, Source, SourceKind, SourceVideo, User, Video,
};

use crate::config::MonitorConfig;
use crate::store::{Store, StoreError};
use crate::youtube::VideoProvider;

use super::policy::should_include;
use super::progress::ProgressTracker;
use super::quota::{QuotaGuard, CHANNEL_INFO_COST, CHANNEL_SEARCH_COST, PLAYLIST_LIST_COST};
use super::MonitorResult;

/// Monitors a user's sources and enqueues generation jobs for new videos.
pub struct ChannelMonitor<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
    config: MonitorConfig,
    quota: Arc<QuotaGuard>,
}

impl<S, P> ChannelMonitor<S, P>
where
    S: Store,
    P: VideoProvider,
{
    pub fn new(store: Arc<S>, provider: Arc<P>, config: MonitorConfig) -> Self {
        let quota = Arc::new(QuotaGuard::new(config.quota_ceiling, config.quota_window()));
        Self {
            store,
            provider,
            config,
            quota,
        }
    }

    /// Walk all of the user's sources and enqueue one job per source that
    /// produced new videos.
    ///
    /// An unknown user or an empty source list is a benign skip. Per-source
    /// failures are logged and cost at most that source's job; only store
    /// failures while loading the user and source list error out.
    pub async fn run(&self, user_id: &str) -> MonitorResult<Vec<GenerationJob>> {
        info!(user_id, "starting channel monitoring run");

        let Some(user) = self.store.get_user(user_id).await? else {
            warn!(user_id, "user not found, nothing to monitor");
            return Ok(Vec::new());
        };

        let sources = self.store.get_sources_by_user(user_id).await?;
        if sources.is_empty() {
            info!(user_id, "no sources configured");
            return Ok(Vec::new());
        }

        // Run-local progress state; concurrent runs never share it.
        let progress = ProgressTracker::new();
        let mut jobs = Vec::new();

        for source in &sources {
            debug!(source_id = %source.id, name = %source.name, kind = source.kind.as_str(), "checking source");
            match self.process_source(&user, source, &progress).await {
                Ok(Some(job)) => jobs.push(job),
                Ok(None) => {},
                Err(err) => {
                    error!(source_id = %source.id, error = %err, "source processing failed");
                },
            }
        }

        info!(user_id, jobs = jobs.len(), "channel monitoring run finished");
        Ok(jobs)
    }

    async fn process_source(
        &self,
        user: &User,
        source: &Source,
        progress: &ProgressTracker,
    ) -> MonitorResult<Option<GenerationJob>> {
        let fetched = match source.kind {
            SourceKind::ChannelCollection => self.collect_channel_videos(source, progress).await?,
            SourceKind::Playlist => {
                let Some(playlist_id) = &source.youtube_playlist_id else {
                    warn!(source_id = %source.id, "playlist source has no playlist id, skipping");
                    return Ok(None);
                };
                self.quota.acquire(PLAYLIST_LIST_COST).await;
                self.provider.fetch_playlist_videos(playlist_id).await?
            },
        };

        if fetched.is_empty() {
            debug!(source_id = %source.id, "no videos fetched for source");
            return Ok(None);
        }

        let deduped = dedup_by_video_id(fetched);
        let merged = self.merge_into_catalog(deduped).await?;

        let included: Vec<Video> = merged
            .into_iter()
            .filter(|video| should_include(video, source))
            .collect();
        if included.is_empty() {
            debug!(source_id = %source.id, "no videos newer than the checkpoint");
            return Ok(None);
        }

        let persisted = self.persist_in_batches(source, included).await;
        if persisted.is_empty() {
            warn!(source_id = %source.id, "all batches dropped, no job for source");
            return Ok(None);
        }

        self.link_videos(source, &persisted).await;
        self.enqueue_job(user, source, &persisted).await
    }

    /// Fan out over a collection's member channels with bounded
    /// concurrency, preserving channel-iteration order in the merged
    /// result. One channel's failure never cancels its siblings.
    async fn collect_channel_videos(
        &self,
        source: &Source,
        progress: &ProgressTracker,
    ) -> MonitorResult<Vec<Video>> {
        let links = self.store.get_source_channels(source.id).await?;
        if links.is_empty() {
            warn!(source_id = %source.id, "collection has no linked channels, skipping");
            return Ok(Vec::new());
        }

        progress.begin_source(source.id, links.len()).await;

        let per_channel: Vec<Vec<Video>> = stream::iter(links)
            .map(|link| async move {
                let videos = self
                    .fetch_one_channel(&link.youtube_channel_id)
                    .await;
                progress.record_channel_done(source.id).await;
                videos
            })
            .buffered(self.config.fetch_concurrency)
            .collect()
            .await;

        Ok(per_channel.into_iter().flatten().collect())
    }

    /// Fetch one channel's listing, degrading every failure to an empty
    /// result so siblings keep going.
    async fn fetch_one_channel(&self, youtube_channel_id: &str) -> Vec<Video> {
        let channel = match self.store.get_channel(youtube_channel_id).await {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                warn!(youtube_channel_id, "channel not in catalog, skipping");
                return Vec::new();
            },
            Err(err) => {
                error!(youtube_channel_id, error = %err, "channel lookup failed");
                return Vec::new();
            },
        };

        self.quota.acquire(CHANNEL_SEARCH_COST).await;
        match self
            .provider
            .fetch_channel_videos(&channel.youtube_channel_id)
            .await
        {
            Ok(videos) => {
                debug!(youtube_channel_id, count = videos.len(), "fetched channel videos");
                videos
            },
            Err(err) => {
                error!(youtube_channel_id, error = %err, "channel listing failed");
                Vec::new()
            },
        }
    }

    /// Ensure owning channels exist in the catalog, then reconcile each
    /// fetched video against the stored record. Videos whose channel
    /// cannot be resolved by either backend are dropped with a warning.
    async fn merge_into_catalog(&self, videos: Vec<Video>) -> MonitorResult<Vec<Video>> {
        let mut channel_ids: Vec<&str> = videos.iter().map(|v| v.channel_id.as_str()).collect();
        channel_ids.sort_unstable();
        channel_ids.dedup();

        let mut known: HashSet<String> = HashSet::new();
        let mut missing: Vec<String> = Vec::new();
        for channel_id in channel_ids {
            if self.store.get_channel(channel_id).await?.is_some() {
                known.insert(channel_id.to_string());
            } else {
                missing.push(channel_id.to_string());
            }
        }

        let mut resolved = Vec::new();
        for channel_id in &missing {
            self.quota.acquire(CHANNEL_INFO_COST).await;
            match self.provider.fetch_channel_info(channel_id).await {
                Ok(Some(channel)) => resolved.push(channel),
                Ok(None) => {
                    warn!(%channel_id, "channel unresolvable by any backend");
                },
                Err(err) => {
                    error!(%channel_id, error = %err, "channel info fetch failed");
                },
            }
        }
        if !resolved.is_empty() {
            let stored = self.store.bulk_insert_channels(&resolved).await?;
            known.extend(stored.into_iter().map(|c| c.youtube_channel_id));
        }

        let mut merged = Vec::with_capacity(videos.len());
        for video in videos {
            if !known.contains(&video.channel_id) {
                warn!(
                    video_id = %video.youtube_video_id,
                    channel_id = %video.channel_id,
                    "dropping video with unresolved channel"
                );
                continue;
            }
            // Reuse the stored record when the catalog has seen the video.
            match self.store.get_video(&video.youtube_video_id).await? {
                Some(stored) => merged.push(stored),
                None => merged.push(video),
            }
        }

        Ok(merged)
    }

    /// Persist included videos in fixed-size batches; a batch that
    /// exhausts its retries is dropped from the job, and the run goes on.
    async fn persist_in_batches(&self, source: &Source, included: Vec<Video>) -> Vec<Video> {
        let mut persisted = Vec::with_capacity(included.len());
        for batch in included.chunks(self.config.batch_size.max(1)) {
            if let Some(stored) = self.persist_batch(source, batch).await {
                persisted.extend(stored);
            }
        }
        persisted
    }

    async fn persist_batch(&self, source: &Source, batch: &[Video]) -> Option<Vec<Video>> {
        let mut attempts = 0u32;
        loop {
            match self.store.bulk_insert_videos(batch).await {
                Ok(stored) => return Some(stored),
                Err(err) if attempts < self.config.max_retries => {
                    attempts += 1;
                    if matches!(err, StoreError::RateLimited(_)) {
                        warn!(
                            source_id = %source.id,
                            attempt = attempts,
                            error = %err,
                            "batch rate limited, cooling down before retry"
                        );
                        tokio::time::sleep(self.config.retry_cooldown()).await;
                    } else {
                        warn!(
                            source_id = %source.id,
                            attempt = attempts,
                            error = %err,
                            "batch insert failed, retrying"
                        );
                    }
                },
                Err(err) => {
                    error!(
                        source_id = %source.id,
                        batch_len = batch.len(),
                        error = %err,
                        "batch dropped after retries exhausted"
                    );
                    return None;
                },
            }
        }
    }

    /// Bulk-link videos to the source, falling back to per-video links so
    /// one bad record does not lose the whole batch.
    async fn link_videos(&self, source: &Source, videos: &[Video]) {
        let links: Vec<SourceVideo> = videos
            .iter()
            .map(|v| SourceVideo::new(source.id, &v.youtube_video_id))
            .collect();

        if let Err(err) = self.store.bulk_insert_source_videos(&links).await {
            warn!(
                source_id = %source.id,
                error = %err,
                "bulk linking failed, falling back to per-video links"
            );
            for link in &links {
                if let Err(err) = self.store.insert_source_video(link).await {
                    error!(
                        source_id = %source.id,
                        video_id = %link.youtube_video_id,
                        error = %err,
                        "failed to link video to source"
                    );
                }
            }
        }
    }

    /// Insert the queued job, verify it landed on the right source, and
    /// only then advance the checkpoint.
    async fn enqueue_job(
        &self,
        user: &User,
        source: &Source,
        videos: &[Video],
    ) -> MonitorResult<Option<GenerationJob>> {
        let video_ids: Vec<String> = videos
            .iter()
            .map(|v| v.youtube_video_id.clone())
            .collect();
        let options = ProcessingOptions {
            video_ids,
            source_id: source.id,
            preferences: source.preferences.clone(),
        };
        let job = GenerationJob::queued(&user.id, source.id, JobConfig::for_processing(options));

        let inserted = match self.store.insert_generation_job(&job).await {
            Ok(inserted) => inserted,
            Err(err) => {
                error!(source_id = %source.id, error = %err, "could not enqueue generation job");
                return Ok(None);
            },
        };

        if inserted.source_id != Some(source.id) {
            error!(
                job_id = %inserted.id,
                expected_source_id = %source.id,
                actual_source_id = ?inserted.source_id,
                "persisted job does not reference the requested source, discarding"
            );
            return Ok(None);
        }

        info!(
            job_id = %inserted.id,
            source_id = %source.id,
            videos = videos.len(),
            "generation job queued"
        );

        // The checkpoint advances only after the job is durably queued.
        if let Err(err) = self
            .store
            .update_source_checkpoint(source.id, Utc::now())
            .await
        {
            error!(source_id = %source.id, error = %err, "failed to advance source checkpoint");
        }

        Ok(Some(inserted))
    }
}

/// Order-preserving dedup by video id. A channel's fetch result must never
/// contribute the same video twice to one run's processing.
fn dedup_by_video_id(videos: Vec<Video>) -> Vec<Video> {
    let mut seen = HashSet::with_capacity(videos.len());
    videos
        .into_iter()
        .filter(|video| seen.insert(video.youtube_video_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn video(id: &str) -> Video {
        Video {
            youtube_video_id: id.to_string(),
            title: None,
            description: None,
            url: None,
            channel_id: "UC1".to_string(),
            uploaded_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let deduped = dedup_by_video_id(vec![video("a"), video("b"), video("a"), video("c")]);
        let ids: Vec<&str> = deduped.iter().map(|v| v.youtube_video_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
