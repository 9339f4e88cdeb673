//! TickerLake Pipeline — batch orchestration over the core engines.
//!
//! This crate builds on `tickerlake-core` to provide:
//! - The ingestion run: acquire → normalize → raw partitioned write
//! - The refine run: raw read → transform → aggregate → refined write
//! - Pipeline configuration (TOML)
//! - The catalog-refresh trigger fired after a successful refine
//! - Batch fan-out across independent (dataset, ticker) keys
//!
//! Each run processes one (dataset, ticker) end to end. Within one key the
//! refine stage always reads a fully-written raw state — the partition
//! store's per-partition atomicity is the only synchronization point.

pub mod catalog;
pub mod config;
pub mod ingestion;
pub mod refine;

pub use catalog::{CatalogError, CatalogNotifier, LoggingNotifier};
pub use config::{ConfigError, PipelineConfig};
pub use ingestion::{run_ingestion, run_ingestion_batch, IngestionReport};
pub use refine::{run_refine, RefineReport};

use thiserror::Error;
use tickerlake_core::source::AcquireError;
use tickerlake_core::store::StoreError;
use tickerlake_core::transform::TransformError;

/// Orchestrator-level failure: one clearly attributed error kind with its
/// cause chain. No partial cleanup is performed beyond what per-partition
/// atomicity already guarantees.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Cooperative cancellation observed at a write boundary.
    #[error("run cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_preserves_kind() {
        let err: PipelineError = StoreError::Codec("bad column".into()).into();
        assert!(matches!(err, PipelineError::Store(_)));
        assert!(err.to_string().contains("bad column"));
    }
}
