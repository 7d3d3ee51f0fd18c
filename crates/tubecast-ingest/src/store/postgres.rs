//! Postgres-backed record store
//!
//! Runtime-bound sqlx queries against the schema in `migrations/`. Bulk
//! upserts go through `UNNEST` so a whole batch is one round trip; conflict
//! targets are the natural keys, refreshing basic fields only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use tubecast_common::types::{
    Channel, GenerationJob, JobConfig, Source, SourceChannel, SourceVideo, User, Video,
};

use super::{Store, StoreError, StoreResult};

const VIDEO_COLUMNS: &str =
    "youtube_video_id, title, description, url, channel_id, uploaded_at, created_at";
const CHANNEL_COLUMNS: &str =
    "youtube_channel_id, title, description, channel_url, created_at";
const SOURCE_COLUMNS: &str =
    "id, user_id, kind, name, youtube_playlist_id, preferences, last_processed_at, created_at";
const JOB_COLUMNS: &str = "id, user_id, source_id, status, config, error_message, \
     created_at, updated_at, started_at, finished_at";

/// Postgres [`Store`] implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a small dedicated pool.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply embedded migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_user(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        refresh_token: row.try_get("refresh_token")?,
        token_expires_at: row.try_get("token_expires_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_channel(row: &PgRow) -> Result<Channel, sqlx::Error> {
    Ok(Channel {
        youtube_channel_id: row.try_get("youtube_channel_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        channel_url: row.try_get("channel_url")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_source(row: &PgRow) -> Result<Source, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    let preferences: Json<Map<String, Value>> = row.try_get("preferences")?;
    Ok(Source {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        kind: kind.into(),
        name: row.try_get("name")?,
        youtube_playlist_id: row.try_get("youtube_playlist_id")?,
        preferences: preferences.0,
        last_processed_at: row.try_get("last_processed_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_video(row: &PgRow) -> Result<Video, sqlx::Error> {
    Ok(Video {
        youtube_video_id: row.try_get("youtube_video_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        url: row.try_get("url")?,
        channel_id: row.try_get("channel_id")?,
        uploaded_at: row.try_get("uploaded_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_source_video(row: &PgRow) -> Result<SourceVideo, sqlx::Error> {
    Ok(SourceVideo {
        source_id: row.try_get("source_id")?,
        youtube_video_id: row.try_get("youtube_video_id")?,
        processed_at: row.try_get("processed_at")?,
    })
}

fn map_job(row: &PgRow) -> Result<GenerationJob, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let config: Json<JobConfig> = row.try_get("config")?;
    Ok(GenerationJob {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        source_id: row.try_get("source_id")?,
        status: status.into(),
        config: config.0,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, display_name, refresh_token, token_expires_at, \
             created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose().map_err(Into::into)
    }

    async fn get_sources_by_user(&self, user_id: &str) -> StoreResult<Vec<Source>> {
        let rows = sqlx::query(&format!(
            "SELECT {SOURCE_COLUMNS} FROM sources WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(map_source)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    async fn get_source_channels(&self, source_id: Uuid) -> StoreResult<Vec<SourceChannel>> {
        let rows = sqlx::query(
            "SELECT source_id, youtube_channel_id FROM source_channels WHERE source_id = $1",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SourceChannel {
                    source_id: row.try_get("source_id")?,
                    youtube_channel_id: row.try_get("youtube_channel_id")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(Into::into)
    }

    async fn get_channel(&self, youtube_channel_id: &str) -> StoreResult<Option<Channel>> {
        let row = sqlx::query(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE youtube_channel_id = $1"
        ))
        .bind(youtube_channel_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(map_channel)
            .transpose()
            .map_err(Into::into)
    }

    async fn insert_channel(&self, channel: &Channel) -> StoreResult<Channel> {
        let row = sqlx::query(&format!(
            "INSERT INTO channels ({CHANNEL_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (youtube_channel_id) DO UPDATE \
             SET title = EXCLUDED.title, description = EXCLUDED.description \
             RETURNING {CHANNEL_COLUMNS}"
        ))
        .bind(&channel.youtube_channel_id)
        .bind(&channel.title)
        .bind(&channel.description)
        .bind(&channel.channel_url)
        .bind(channel.created_at)
        .fetch_one(&self.pool)
        .await?;

        map_channel(&row).map_err(Into::into)
    }

    async fn bulk_insert_channels(&self, channels: &[Channel]) -> StoreResult<Vec<Channel>> {
        if channels.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = channels.iter().map(|c| c.youtube_channel_id.as_str()).collect();
        let titles: Vec<Option<&str>> = channels.iter().map(|c| c.title.as_deref()).collect();
        let descriptions: Vec<Option<&str>> =
            channels.iter().map(|c| c.description.as_deref()).collect();
        let urls: Vec<Option<&str>> = channels.iter().map(|c| c.channel_url.as_deref()).collect();
        let created: Vec<DateTime<Utc>> = channels.iter().map(|c| c.created_at).collect();

        let rows = sqlx::query(&format!(
            "INSERT INTO channels ({CHANNEL_COLUMNS}) \
             SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], $5::timestamptz[]) \
             ON CONFLICT (youtube_channel_id) DO UPDATE \
             SET title = EXCLUDED.title, description = EXCLUDED.description \
             RETURNING {CHANNEL_COLUMNS}"
        ))
        .bind(ids)
        .bind(titles)
        .bind(descriptions)
        .bind(urls)
        .bind(created)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(map_channel)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    async fn get_video(&self, youtube_video_id: &str) -> StoreResult<Option<Video>> {
        let row = sqlx::query(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE youtube_video_id = $1"
        ))
        .bind(youtube_video_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_video).transpose().map_err(Into::into)
    }

    async fn insert_video(&self, video: &Video) -> StoreResult<Video> {
        let row = sqlx::query(&format!(
            "INSERT INTO videos ({VIDEO_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (youtube_video_id) DO UPDATE \
             SET title = EXCLUDED.title, description = EXCLUDED.description, url = EXCLUDED.url \
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(&video.youtube_video_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.url)
        .bind(&video.channel_id)
        .bind(video.uploaded_at)
        .bind(video.created_at)
        .fetch_one(&self.pool)
        .await?;

        map_video(&row).map_err(Into::into)
    }

    async fn bulk_insert_videos(&self, videos: &[Video]) -> StoreResult<Vec<Video>> {
        if videos.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = videos.iter().map(|v| v.youtube_video_id.as_str()).collect();
        let titles: Vec<Option<&str>> = videos.iter().map(|v| v.title.as_deref()).collect();
        let descriptions: Vec<Option<&str>> =
            videos.iter().map(|v| v.description.as_deref()).collect();
        let urls: Vec<Option<&str>> = videos.iter().map(|v| v.url.as_deref()).collect();
        let channel_ids: Vec<&str> = videos.iter().map(|v| v.channel_id.as_str()).collect();
        let uploaded: Vec<Option<DateTime<Utc>>> = videos.iter().map(|v| v.uploaded_at).collect();
        let created: Vec<DateTime<Utc>> = videos.iter().map(|v| v.created_at).collect();

        // DO UPDATE keeps uploaded_at/created_at from the stored row.
        let rows = sqlx::query(&format!(
            "INSERT INTO videos ({VIDEO_COLUMNS}) \
             SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], \
                                  $5::text[], $6::timestamptz[], $7::timestamptz[]) \
             ON CONFLICT (youtube_video_id) DO UPDATE \
             SET title = EXCLUDED.title, description = EXCLUDED.description, url = EXCLUDED.url \
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(ids)
        .bind(titles)
        .bind(descriptions)
        .bind(urls)
        .bind(channel_ids)
        .bind(uploaded)
        .bind(created)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(map_video)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    async fn get_source_video(
        &self,
        source_id: Uuid,
        youtube_video_id: &str,
    ) -> StoreResult<Option<SourceVideo>> {
        let row = sqlx::query(
            "SELECT source_id, youtube_video_id, processed_at FROM source_videos \
             WHERE source_id = $1 AND youtube_video_id = $2",
        )
        .bind(source_id)
        .bind(youtube_video_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(map_source_video)
            .transpose()
            .map_err(Into::into)
    }

    async fn insert_source_video(&self, link: &SourceVideo) -> StoreResult<SourceVideo> {
        sqlx::query(
            "INSERT INTO source_videos (source_id, youtube_video_id, processed_at) \
             VALUES ($1, $2, $3) ON CONFLICT (source_id, youtube_video_id) DO NOTHING",
        )
        .bind(link.source_id)
        .bind(&link.youtube_video_id)
        .bind(link.processed_at)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT source_id, youtube_video_id, processed_at FROM source_videos \
             WHERE source_id = $1 AND youtube_video_id = $2",
        )
        .bind(link.source_id)
        .bind(&link.youtube_video_id)
        .fetch_one(&self.pool)
        .await?;

        map_source_video(&row).map_err(Into::into)
    }

    async fn bulk_insert_source_videos(
        &self,
        links: &[SourceVideo],
    ) -> StoreResult<Vec<SourceVideo>> {
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let source_ids: Vec<Uuid> = links.iter().map(|l| l.source_id).collect();
        let video_ids: Vec<&str> = links.iter().map(|l| l.youtube_video_id.as_str()).collect();
        let processed: Vec<Option<DateTime<Utc>>> = links.iter().map(|l| l.processed_at).collect();

        // DO NOTHING on conflict: RETURNING only carries freshly created links.
        let rows = sqlx::query(
            "INSERT INTO source_videos (source_id, youtube_video_id, processed_at) \
             SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::timestamptz[]) \
             ON CONFLICT (source_id, youtube_video_id) DO NOTHING \
             RETURNING source_id, youtube_video_id, processed_at",
        )
        .bind(source_ids)
        .bind(video_ids)
        .bind(processed)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(map_source_video)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    async fn insert_generation_job(&self, job: &GenerationJob) -> StoreResult<GenerationJob> {
        let row = sqlx::query(&format!(
            "INSERT INTO generation_jobs ({JOB_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(job.id)
        .bind(&job.user_id)
        .bind(job.source_id)
        .bind(job.status.as_str())
        .bind(Json(&job.config))
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .fetch_one(&self.pool)
        .await?;

        map_job(&row).map_err(Into::into)
    }

    async fn update_source_checkpoint(
        &self,
        source_id: Uuid,
        processed_at: DateTime<Utc>,
    ) -> StoreResult<Source> {
        let row = sqlx::query(&format!(
            "UPDATE sources SET last_processed_at = $2 WHERE id = $1 RETURNING {SOURCE_COLUMNS}"
        ))
        .bind(source_id)
        .bind(processed_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => map_source(&row).map_err(Into::into),
            None => Err(StoreError::NotFound(format!("source {source_id}"))),
        }
    }
}
