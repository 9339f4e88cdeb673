//! Acquisition coordinator: ordered source fallback with bounded retry.
//!
//! Tries each configured source in order. Transient failures are retried
//! with exponential backoff up to a fixed bound; schema failures and empty
//! results abandon the source immediately. The first source that yields a
//! non-empty normalized series inside the requested range wins and later
//! sources are never consulted. Retries are sequential — backoff sleeps
//! block the calling thread only, respecting per-provider rate limits.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::domain::{Series, SeriesKey};
use crate::source::normalize::normalize;
use crate::source::provider::{DateRange, FetchError, QuoteSource, RawQuote};

/// Retry/backoff parameters, passed explicitly — no module-level state.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts per source, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per subsequent retry.
    pub base_delay: Duration,
    /// Upper bound on any single backoff sleep.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based): `base * 2^(retry-1)`, capped.
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Why one source ended up abandoned.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub error: FetchError,
}

/// Acquisition failure surfaced to the orchestrator.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("no data available for '{ticker}': all {} sources exhausted", .failures.len())]
    NoDataAvailable {
        ticker: String,
        failures: Vec<SourceFailure>,
    },

    #[error("acquisition cancelled")]
    Cancelled,
}

impl AcquireError {
    /// Per-source failure reasons for diagnostics, one line each.
    pub fn causes(&self) -> Vec<String> {
        match self {
            AcquireError::NoDataAvailable { failures, .. } => failures
                .iter()
                .map(|f| format!("{}: {}", f.source, f.error))
                .collect(),
            AcquireError::Cancelled => vec![],
        }
    }
}

/// Coordinates an ordered list of sources into one acquisition attempt.
pub struct AcquisitionCoordinator {
    sources: Vec<Box<dyn QuoteSource>>,
    retry: RetryPolicy,
    cancel: CancelToken,
}

impl AcquisitionCoordinator {
    pub fn new(sources: Vec<Box<dyn QuoteSource>>, retry: RetryPolicy) -> Self {
        Self {
            sources,
            retry,
            cancel: CancelToken::new(),
        }
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Produce a non-empty normalized series for `key` inside `range`.
    ///
    /// Performs no storage writes; the only side effect is the fetches
    /// themselves.
    pub fn acquire(&self, key: &SeriesKey, range: DateRange) -> Result<Series, AcquireError> {
        let mut failures: Vec<SourceFailure> = Vec::new();

        for source in &self.sources {
            info!(source = source.name(), ticker = %key.ticker, "trying source");

            match self.try_source(source.as_ref(), key, range)? {
                Ok(series) => {
                    info!(
                        source = source.name(),
                        ticker = %key.ticker,
                        records = series.len(),
                        "source succeeded"
                    );
                    return Ok(series);
                }
                Err(error) => {
                    warn!(source = source.name(), ticker = %key.ticker, %error, "source failed");
                    failures.push(SourceFailure {
                        source: source.name().to_string(),
                        error,
                    });
                }
            }
        }

        Err(AcquireError::NoDataAvailable {
            ticker: key.ticker.clone(),
            failures,
        })
    }

    /// Run one source through the retry loop.
    ///
    /// Outer `Err` is cancellation; inner `Err` is the failure that
    /// exhausted or abandoned this source.
    fn try_source(
        &self,
        source: &dyn QuoteSource,
        key: &SeriesKey,
        range: DateRange,
    ) -> Result<Result<Series, FetchError>, AcquireError> {
        let mut last_error: Option<FetchError> = None;

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                let delay = self.retry.backoff(attempt - 1);
                debug!(
                    source = source.name(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "backing off before retry"
                );
                std::thread::sleep(delay);
            }

            if self.cancel.is_cancelled() {
                return Err(AcquireError::Cancelled);
            }

            match source.fetch(&key.ticker, range) {
                Ok(quotes) => {
                    return Ok(self.finish_batch(source.name(), key, range, &quotes));
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    warn!(source = source.name(), attempt, error = %e, "transient failure, will retry");
                    last_error = Some(e);
                }
                Err(e) => return Ok(Err(e)),
            }
        }

        Ok(Err(last_error
            .unwrap_or_else(|| FetchError::Transient("max attempts exceeded".into()))))
    }

    /// Normalize a fetched batch and intersect it against the request range.
    fn finish_batch(
        &self,
        source_name: &str,
        key: &SeriesKey,
        range: DateRange,
        quotes: &[RawQuote],
    ) -> Result<Series, FetchError> {
        let mut series = normalize(key, source_name, quotes)?;

        // Providers may return more history than requested.
        let before = series.len();
        series.records.retain(|r| range.contains(r.date));
        if series.len() < before {
            debug!(
                source = source_name,
                discarded = before - series.len(),
                "discarded rows outside the requested range"
            );
        }

        if series.is_empty() {
            return Err(FetchError::Empty);
        }

        Ok(series)
    }
}
