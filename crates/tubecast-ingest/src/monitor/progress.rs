//! Per-run progress tracking
//!
//! Channel-fetch progress per source, for observability while a collection
//! fans out. The tracker is constructed inside `run` and dropped with it,
//! so concurrent runs for different users never share counters. Updates
//! happen under a lock because channel fetches may complete concurrently.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Channel counts for one source within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceProgress {
    pub total: usize,
    pub processed: usize,
}

/// Progress map owned by a single run.
#[derive(Default)]
pub struct ProgressTracker {
    inner: Mutex<HashMap<Uuid, SourceProgress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn begin_source(&self, source_id: Uuid, total: usize) {
        self.inner.lock().await.insert(
            source_id,
            SourceProgress {
                total,
                processed: 0,
            },
        );
    }

    /// Tick the processed count for a source, succeeded or not.
    pub async fn record_channel_done(&self, source_id: Uuid) {
        let mut inner = self.inner.lock().await;
        let progress = inner.entry(source_id).or_default();
        progress.processed += 1;
        debug!(
            %source_id,
            processed = progress.processed,
            total = progress.total,
            "channel fetch completed"
        );
    }

    pub async fn snapshot(&self, source_id: Uuid) -> Option<SourceProgress> {
        self.inner.lock().await.get(&source_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_completed_channels() {
        let tracker = ProgressTracker::new();
        let source_id = Uuid::new_v4();

        tracker.begin_source(source_id, 3).await;
        tracker.record_channel_done(source_id).await;
        tracker.record_channel_done(source_id).await;

        let progress = tracker.snapshot(source_id).await.unwrap();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.processed, 2);
    }
}
