//! Ingestion engine
//!
//! Orchestrates, per user and per source: channel/playlist resolution,
//! video fetch, catalog merge, inclusion filtering, batched persistence,
//! job creation and checkpoint update. All anticipated failure modes
//! degrade to "fewer jobs produced" rather than erroring out of a run.

pub mod engine;
pub mod policy;
pub mod progress;
pub mod quota;

pub use engine::ChannelMonitor;
pub use policy::should_include;
pub use progress::{ProgressTracker, SourceProgress};
pub use quota::QuotaGuard;

use crate::store::StoreError;
use crate::youtube::ProviderError;

/// Result type for engine operations
pub type MonitorResult<T> = std::result::Result<T, MonitorError>;

/// Failures that abort a unit of work inside the engine.
///
/// These are the contract-violation class: unexpected store/provider
/// failures. They end the affected source's processing early but are
/// caught at the per-source boundary so sibling sources still run; only
/// failures while loading the user and source list escape `run` itself.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}
