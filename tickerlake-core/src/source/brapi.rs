//! Brapi quote API provider (primary).
//!
//! Fetches daily history from `brapi.dev`. The API takes a named range
//! period rather than explicit dates, so the requested range is mapped to
//! the smallest period that covers it; the coordinator trims the surplus.
//! Dates arrive as epoch seconds, OHLCV fields as optional numbers.

use serde::Deserialize;
use std::time::Duration;

use crate::source::provider::{DateRange, FetchError, QuoteSource, RawQuote};

const DEFAULT_ENDPOINT: &str = "https://brapi.dev/api/quote";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    results: Option<Vec<QuoteResult>>,
}

#[derive(Debug, Deserialize)]
struct QuoteResult {
    #[serde(rename = "historicalDataPrice")]
    historical: Option<Vec<HistoricalRow>>,
}

#[derive(Debug, Deserialize)]
struct HistoricalRow {
    date: Option<i64>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

/// Brapi history provider.
pub struct BrapiSource {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl BrapiSource {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Point the provider at a different base URL (tests, mirrors).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Smallest named range period covering the requested span.
    fn range_period(range: DateRange) -> &'static str {
        match range.days() {
            ..=5 => "5d",
            6..=30 => "1mo",
            31..=90 => "3mo",
            91..=180 => "6mo",
            _ => "1y",
        }
    }

    fn parse_response(resp: QuoteResponse) -> Result<Vec<RawQuote>, FetchError> {
        let result = resp
            .results
            .and_then(|r| r.into_iter().next())
            .ok_or(FetchError::Empty)?;

        let historical = result
            .historical
            .ok_or_else(|| FetchError::SchemaInvalid("no historicalDataPrice field".into()))?;

        if historical.is_empty() {
            return Err(FetchError::Empty);
        }

        let mut quotes = Vec::with_capacity(historical.len());
        for row in historical {
            let epoch_secs = row
                .date
                .ok_or_else(|| FetchError::SchemaInvalid("history row without a date".into()))?;
            quotes.push(RawQuote {
                epoch_secs,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        Ok(quotes)
    }
}

impl Default for BrapiSource {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteSource for BrapiSource {
    fn name(&self) -> &str {
        "brapi"
    }

    fn fetch(&self, ticker: &str, range: DateRange) -> Result<Vec<RawQuote>, FetchError> {
        let symbol = ticker.to_uppercase();
        let url = format!("{}/{symbol}", self.endpoint);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("range", Self::range_period(range)),
                ("interval", "1d"),
                ("fundamental", "false"),
            ])
            .send()
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(FetchError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::SchemaInvalid(format!(
                "symbol '{symbol}' not found"
            )));
        }

        if !status.is_success() {
            return Err(FetchError::Transient(format!("HTTP {status} for {symbol}")));
        }

        let parsed: QuoteResponse = resp
            .json()
            .map_err(|e| FetchError::Transient(format!("failed to parse response: {e}")))?;

        Self::parse_response(parsed)
    }
}
