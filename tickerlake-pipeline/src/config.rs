//! Serializable pipeline configuration.
//!
//! Ambient settings only — the instrument, dataset, and lookback are
//! runtime arguments to the entry points, not configuration. Every field
//! has a default, so a missing file or empty table means built-in
//! behavior.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tickerlake_core::source::{
    AcquisitionCoordinator, BrapiSource, QuoteSource, RetryPolicy, YahooChartSource,
};
use tickerlake_core::transform::{default_anchor, WindowTransform};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("unknown source '{0}' (valid: brapi, yahoo)")]
    UnknownSource(String),
}

/// Pipeline configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Root directory of the partition store.
    pub store_root: PathBuf,

    /// Anchor date for the day-index column.
    pub anchor_date: chrono::NaiveDate,

    /// Ordered source fallback list.
    pub sources: Vec<String>,

    /// Exchange suffix for Yahoo symbols (B3 tickers carry `.SA`).
    pub yahoo_suffix: String,

    /// Name of the downstream catalog to refresh after a refine run.
    pub catalog_name: String,

    pub retry: RetryConfig,
}

/// Retry/backoff bounds for the acquisition coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("data"),
            anchor_date: default_anchor(),
            sources: vec!["brapi".into(), "yahoo".into()],
            yahoo_suffix: ".SA".into(),
            catalog_name: "refined".into(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn window_transform(&self) -> WindowTransform {
        WindowTransform::new(self.anchor_date)
    }

    /// Build the coordinator from the configured source order.
    pub fn coordinator(&self) -> Result<AcquisitionCoordinator, ConfigError> {
        let mut sources: Vec<Box<dyn QuoteSource>> = Vec::with_capacity(self.sources.len());
        for name in &self.sources {
            match name.as_str() {
                "brapi" => sources.push(Box::new(BrapiSource::new())),
                "yahoo" => sources.push(Box::new(YahooChartSource::new(self.yahoo_suffix.as_str()))),
                other => return Err(ConfigError::UnknownSource(other.to_string())),
            }
        }
        Ok(AcquisitionCoordinator::new(sources, self.retry_policy()))
    }
}
