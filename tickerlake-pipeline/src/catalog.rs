//! Downstream catalog trigger.
//!
//! After a successful refined write the orchestrator asks a catalog
//! collaborator to refresh by name. The real collaborator is external
//! (a crawler/catalog service); failure to notify is logged and never
//! fails the pipeline run.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog refresh failed for '{catalog}': {reason}")]
    RefreshFailed { catalog: String, reason: String },
}

/// Collaborator that refreshes a downstream catalog over the refined layer.
pub trait CatalogNotifier: Send + Sync {
    fn refresh(&self, catalog: &str) -> Result<(), CatalogError>;
}

/// Default notifier: records the request and succeeds. Stands in for the
/// external crawler client in local runs and tests.
pub struct LoggingNotifier;

impl CatalogNotifier for LoggingNotifier {
    fn refresh(&self, catalog: &str) -> Result<(), CatalogError> {
        info!(catalog, "catalog refresh requested");
        Ok(())
    }
}
