//! Monitor configuration
//!
//! Knobs for the ingestion engine and its listing backends, loaded from
//! environment variables with production defaults. Base URLs are
//! overridable so tests can point both backends at a mock server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::youtube::data_api::DEFAULT_API_BASE_URL;
use crate::youtube::feed::DEFAULT_FEED_BASE_URL;

/// Configuration for the ingestion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Videos per persistence batch
    pub batch_size: usize,
    /// Retry ceiling for a failing batch
    pub max_retries: u32,
    /// Cooldown before retrying a rate-limited batch, in seconds
    pub retry_cooldown_secs: u64,
    /// Daily unit budget for the primary backend
    pub quota_ceiling: u64,
    /// Length of the rolling quota window, in seconds
    pub quota_window_secs: u64,
    /// Bounded concurrency for channel fan-out within one source
    pub fetch_concurrency: usize,
    /// Data API key; listing calls fail `Unauthenticated` without one
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub feed_base_url: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_retries: 3,
            retry_cooldown_secs: 60,
            quota_ceiling: 10_000,
            quota_window_secs: 86_400,
            fetch_concurrency: 4,
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

impl MonitorConfig {
    /// Load configuration from environment variables
    ///
    /// Recognized: `MONITOR_BATCH_SIZE`, `MONITOR_MAX_RETRIES`,
    /// `MONITOR_RETRY_COOLDOWN_SECS`, `MONITOR_QUOTA_CEILING`,
    /// `MONITOR_QUOTA_WINDOW_SECS`, `MONITOR_FETCH_CONCURRENCY`,
    /// `YOUTUBE_API_KEY`, `YOUTUBE_API_BASE_URL`, `YOUTUBE_FEED_BASE_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: env_parsed("MONITOR_BATCH_SIZE", defaults.batch_size),
            max_retries: env_parsed("MONITOR_MAX_RETRIES", defaults.max_retries),
            retry_cooldown_secs: env_parsed(
                "MONITOR_RETRY_COOLDOWN_SECS",
                defaults.retry_cooldown_secs,
            ),
            quota_ceiling: env_parsed("MONITOR_QUOTA_CEILING", defaults.quota_ceiling),
            quota_window_secs: env_parsed(
                "MONITOR_QUOTA_WINDOW_SECS",
                defaults.quota_window_secs,
            ),
            fetch_concurrency: env_parsed("MONITOR_FETCH_CONCURRENCY", defaults.fetch_concurrency)
                .max(1),
            api_key: std::env::var("YOUTUBE_API_KEY").ok(),
            api_base_url: std::env::var("YOUTUBE_API_BASE_URL")
                .unwrap_or(defaults.api_base_url),
            feed_base_url: std::env::var("YOUTUBE_FEED_BASE_URL")
                .unwrap_or(defaults.feed_base_url),
        }
    }

    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_secs(self.retry_cooldown_secs)
    }

    pub fn quota_window(&self) -> Duration {
        Duration::from_secs(self.quota_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_cooldown_secs, 60);
        assert_eq!(config.quota_ceiling, 10_000);
        assert_eq!(config.quota_window_secs, 86_400);
        assert!(config.api_key.is_none());
    }
}
