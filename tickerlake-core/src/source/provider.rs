//! Quote source trait and structured fetch errors.
//!
//! The QuoteSource trait abstracts over upstream history APIs (Brapi, Yahoo
//! chart) so the coordinator can iterate an ordered list of strategies and
//! tests can script failures.

use chrono::NaiveDate;
use thiserror::Error;

/// Inclusive date range for a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of calendar days spanned, inclusive of both endpoints.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// One provider-native history row, prior to normalization.
///
/// Providers deliver the date as epoch seconds and may omit any numeric
/// field for a given row; the normalizer decides what survives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawQuote {
    pub epoch_secs: i64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// Failure modes of a single fetch against one provider.
///
/// Only transient kinds are retried; the rest abandon the provider and let
/// the coordinator fall through to the next strategy.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network error, timeout, server error, or unparseable body.
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// HTTP 429 from the provider. Transient.
    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// The payload parsed but is missing required structure or carries
    /// rows that violate the canonical schema.
    #[error("schema invalid: {0}")]
    SchemaInvalid(String),

    /// The provider answered with no usable rows.
    #[error("empty result from provider")]
    Empty,
}

impl FetchError {
    /// Whether the coordinator should retry this provider.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_) | FetchError::RateLimited { .. })
    }
}

/// Trait for upstream history providers.
///
/// Implementations handle the wire specifics of one API. They do not retry
/// and do not touch storage — retry, fallback, and persistence are the
/// coordinator's and orchestrator's jobs.
pub trait QuoteSource: Send + Sync {
    /// Human-readable name, used in logs and failure reports.
    fn name(&self) -> &str;

    /// Fetch daily history rows for a symbol over a date range.
    ///
    /// Providers may return more history than requested; the coordinator
    /// intersects the result against the range after normalization.
    fn fetch(&self, ticker: &str, range: DateRange) -> Result<Vec<RawQuote>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_days_inclusive() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 24).unwrap(),
        );
        assert_eq!(range.days(), 5);
        assert!(range.contains(NaiveDate::from_ymd_opt(2025, 10, 22).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2025, 10, 25).unwrap()));
    }

    #[test]
    fn transient_classification() {
        assert!(FetchError::Transient("reset".into()).is_transient());
        assert!(FetchError::RateLimited { retry_after_secs: 30 }.is_transient());
        assert!(!FetchError::SchemaInvalid("missing field".into()).is_transient());
        assert!(!FetchError::Empty.is_transient());
    }
}
