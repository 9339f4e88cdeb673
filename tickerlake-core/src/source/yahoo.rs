//! Yahoo Finance chart provider (secondary).
//!
//! Fetches daily history from Yahoo's v8 chart API. Yahoo has no official
//! API and is subject to unannounced format changes, which is why it sits
//! behind the primary source in the fallback order. B3 symbols carry the
//! `.SA` suffix on Yahoo; the suffix is configurable.

use serde::Deserialize;
use std::time::Duration;

use crate::source::provider::{DateRange, FetchError, QuoteSource, RawQuote};

const DEFAULT_ENDPOINT: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Yahoo chart history provider.
pub struct YahooChartSource {
    client: reqwest::blocking::Client,
    endpoint: String,
    /// Exchange suffix appended to the ticker (e.g. `.SA` for B3).
    symbol_suffix: String,
}

impl YahooChartSource {
    pub fn new(symbol_suffix: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, symbol_suffix)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, symbol_suffix: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.into(),
            symbol_suffix: symbol_suffix.into(),
        }
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<RawQuote>, FetchError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                FetchError::SchemaInvalid(format!("{}: {}", err.code, err.description))
            } else {
                FetchError::SchemaInvalid("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::SchemaInvalid("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| FetchError::SchemaInvalid(format!("no timestamps for {symbol}")))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::SchemaInvalid(format!("no quote data for {symbol}")))?;

        let mut quotes = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Rows where every field is null are non-trading days; skip them.
            if open.is_none()
                && high.is_none()
                && low.is_none()
                && close.is_none()
                && volume.is_none()
            {
                continue;
            }

            quotes.push(RawQuote {
                epoch_secs: ts,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        if quotes.is_empty() {
            return Err(FetchError::Empty);
        }

        Ok(quotes)
    }
}

impl QuoteSource for YahooChartSource {
    fn name(&self) -> &str {
        "yahoo_chart"
    }

    fn fetch(&self, ticker: &str, range: DateRange) -> Result<Vec<RawQuote>, FetchError> {
        let symbol = format!("{}{}", ticker.to_uppercase(), self.symbol_suffix);

        let period1 = range
            .start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        let period2 = range
            .end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);

        let url = format!("{}/{symbol}", self.endpoint);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
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

        let parsed: ChartResponse = resp
            .json()
            .map_err(|e| FetchError::Transient(format!("failed to parse response: {e}")))?;

        Self::parse_response(&symbol, parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chart_payload() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1760918400, 1761004800],
                    "indicators": {
                        "quote": [{
                            "open": [36.5, 36.9],
                            "high": [37.1, 37.4],
                            "low": [36.2, 36.7],
                            "close": [36.9, 37.2],
                            "volume": [52000000, 48000000]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let quotes = YahooChartSource::parse_response("PETR4.SA", resp).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[1].close, Some(37.2));
    }

    #[test]
    fn skips_all_null_rows() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1760918400, 1761004800],
                    "indicators": {
                        "quote": [{
                            "open": [36.5, null],
                            "high": [37.1, null],
                            "low": [36.2, null],
                            "close": [36.9, null],
                            "volume": [52000000, null]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let quotes = YahooChartSource::parse_response("PETR4.SA", resp).unwrap();
        assert_eq!(quotes.len(), 1);
    }

    #[test]
    fn api_error_is_schema_invalid() {
        let body = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found"}
            }
        }"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let err = YahooChartSource::parse_response("NOPE.SA", resp).unwrap_err();
        assert!(matches!(err, FetchError::SchemaInvalid(_)));
    }

    #[test]
    fn all_rows_null_is_empty() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1760918400],
                    "indicators": {
                        "quote": [{
                            "open": [null],
                            "high": [null],
                            "low": [null],
                            "close": [null],
                            "volume": [null]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            YahooChartSource::parse_response("PETR4.SA", resp),
            Err(FetchError::Empty)
        ));
    }
}
