//! Inclusion policy
//!
//! Pure decision on whether a fetched video is new enough to fold into a
//! source's next generation job. All timestamps are UTC by the time they
//! get here (the provider normalizes at parse time).

use tracing::warn;

use tubecast_common::types::{Source, Video};

/// Should `video` be attached to `source`'s next generation job?
///
/// - No upload timestamp: excluded (cannot be ordered against the
///   checkpoint) and logged as a data-quality event.
/// - Source never processed: included unconditionally. The provider's own
///   page cap is the only bound on the first run; there is deliberately no
///   extra recency cutoff.
/// - Otherwise: included iff uploaded strictly after the checkpoint. Ties
///   are excluded so a video is never picked up twice across consecutive
///   runs sharing a checkpoint boundary.
pub fn should_include(video: &Video, source: &Source) -> bool {
    let Some(uploaded_at) = video.uploaded_at else {
        warn!(
            video_id = %video.youtube_video_id,
            "video has no upload timestamp, excluding from job"
        );
        return false;
    };

    match source.last_processed_at {
        None => true,
        Some(checkpoint) => uploaded_at > checkpoint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::Map;
    use tubecast_common::types::SourceKind;
    use uuid::Uuid;

    fn source(last_processed_at: Option<chrono::DateTime<Utc>>) -> Source {
        Source {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            kind: SourceKind::ChannelCollection,
            name: "test".to_string(),
            youtube_playlist_id: None,
            preferences: Map::new(),
            last_processed_at,
            created_at: Utc::now(),
        }
    }

    fn video(uploaded_at: Option<chrono::DateTime<Utc>>) -> Video {
        Video {
            youtube_video_id: "v1".to_string(),
            title: None,
            description: None,
            url: None,
            channel_id: "UC1".to_string(),
            uploaded_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_first_run_includes_everything() {
        let source = source(None);
        let old = video(Some(Utc::now() - Duration::days(400)));
        let new = video(Some(Utc::now()));

        assert!(should_include(&old, &source));
        assert!(should_include(&new, &source));
    }

    #[test]
    fn test_strictly_after_checkpoint() {
        let checkpoint = Utc::now();
        let source = source(Some(checkpoint));

        let before = video(Some(checkpoint - Duration::seconds(1)));
        let at = video(Some(checkpoint));
        let after = video(Some(checkpoint + Duration::seconds(1)));

        assert!(!should_include(&before, &source));
        assert!(!should_include(&at, &source), "ties are excluded");
        assert!(should_include(&after, &source));
    }

    #[test]
    fn test_missing_upload_timestamp_is_excluded() {
        assert!(!should_include(&video(None), &source(None)));
    }
}
