//! Tubecast Ingest Library
//!
//! Channel/playlist monitoring and ingestion pipeline: walks a user's
//! configured sources, fetches upstream video listings (YouTube Data API
//! with an Atom-feed fallback), reconciles them against the shared catalog,
//! and enqueues one generation job per source for the downstream worker.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tubecast_ingest::config::MonitorConfig;
//! use tubecast_ingest::monitor::ChannelMonitor;
//! use tubecast_ingest::store::postgres::PgStore;
//! use tubecast_ingest::youtube::SourceProvider;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MonitorConfig::from_env();
//!     let store = Arc::new(PgStore::connect("postgres://localhost/tubecast").await?);
//!     let provider = Arc::new(SourceProvider::from_config(&config)?);
//!     let monitor = ChannelMonitor::new(store, provider, config);
//!     let jobs = monitor.run("user-id").await?;
//!     println!("queued {} jobs", jobs.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod monitor;
pub mod store;
pub mod youtube;

pub use config::MonitorConfig;
pub use monitor::ChannelMonitor;
pub use store::Store;
pub use youtube::{SourceProvider, VideoProvider};
