//! Tubecast Common Library
//!
//! Shared types and utilities for the tubecast workspace:
//!
//! - **Types**: domain entities (users, channels, sources, videos, jobs)
//! - **Logging**: centralized tracing configuration
//! - **Time**: upstream timestamp normalization

pub mod logging;
pub mod time;
pub mod types;

pub use types::{
    Channel, GenerationJob, JobConfig, JobStatus, ProcessingOptions, Source, SourceChannel,
    SourceKind, SourceVideo, User, Video,
};
