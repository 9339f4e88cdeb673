//! Record types flowing through the pipeline.
//!
//! `DailyRecord` is the canonical row downstream of normalization: every
//! price field present and finite, volume a non-negative integer, one row
//! per calendar date within a series. `TransformedRecord` adds the derived
//! columns computed by the windowed transform engine.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Identity of one series: a logical dataset plus a normalized ticker.
///
/// Tickers are stored lowercase with any exchange suffix (`.SA`) stripped;
/// see [`SeriesKey::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub dataset: String,
    pub ticker: String,
}

impl SeriesKey {
    /// Build a key, normalizing the ticker (lowercase, `.SA` suffix removed).
    pub fn new(dataset: impl Into<String>, ticker: &str) -> Self {
        Self {
            dataset: dataset.into(),
            ticker: normalize_ticker(ticker),
        }
    }
}

/// Normalize a raw ticker symbol: strip the B3 `.SA` suffix, lowercase.
pub fn normalize_ticker(ticker: &str) -> String {
    let trimmed = ticker.trim();
    let base = trimmed
        .strip_suffix(".SA")
        .or_else(|| trimmed.strip_suffix(".sa"))
        .unwrap_or(trimmed);
    base.to_lowercase()
}

/// Canonical OHLCV row for one trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl DailyRecord {
    /// Invariant check: all prices finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p >= 0.0)
    }
}

/// A full series for one (dataset, ticker), with extraction provenance.
///
/// Records are ascending by date when produced by the normalizer; gaps
/// (weekends, holidays) are expected and are not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub key: SeriesKey,
    /// Name of the source provider that produced the data.
    pub source: String,
    pub records: Vec<DailyRecord>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First and last date, if the series is non-empty.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.records.first(), self.records.last()) {
            (Some(a), Some(b)) => Some((a.date, b.date)),
            _ => None,
        }
    }
}

/// Daily row enriched with order-dependent derived columns.
///
/// Derived fields are pure functions of the row's position in the sorted
/// series; recomputing over an unchanged series yields identical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// Trailing mean of close over the last ≤5 rows (row-count window).
    pub close_ma5: f64,
    /// Trailing mean of volume over the last ≤5 rows.
    pub volume_ma5: f64,
    /// Close of the previous row; `None` on the first row of the series.
    pub prev_close: Option<f64>,
    /// Day-over-day close variation in percent. `None` when the previous
    /// close is absent or zero — "undefined" is distinct from "zero change".
    pub pct_change: Option<f64>,
    /// Whole days from the configured anchor date; negative before it.
    pub day_index: i64,
}

impl TransformedRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

/// Reducing statistics shared by the monthly and full-period rollups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Number of trading days in the group.
    pub trading_days: u32,
    pub close_mean: f64,
    pub close_min: f64,
    pub close_max: f64,
    pub volume_sum: u64,
    pub volume_mean: f64,
    /// Sample (N−1) standard deviation of close; `None` when the group has
    /// fewer than 2 rows, never 0.0 or NaN.
    pub close_stddev: Option<f64>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// Rollup for one (ticker, year, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub ticker: String,
    pub year: i32,
    pub month: u32,
    pub stats: AggregateStats,
}

impl MonthlyAggregate {
    /// `YYYY-MM` label for reports.
    pub fn period(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// Rollup over the full available history of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    pub ticker: String,
    pub stats: AggregateStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
            open: 36.5,
            high: 37.1,
            low: 36.2,
            close: 36.9,
            volume: 52_000_000,
        }
    }

    #[test]
    fn ticker_normalization() {
        assert_eq!(normalize_ticker("PETR4.SA"), "petr4");
        assert_eq!(normalize_ticker("PETR4"), "petr4");
        assert_eq!(normalize_ticker(" vale3 "), "vale3");
    }

    #[test]
    fn series_key_normalizes() {
        let key = SeriesKey::new("petr4", "PETR4.SA");
        assert_eq!(key.ticker, "petr4");
        assert_eq!(key.dataset, "petr4");
    }

    #[test]
    fn record_validity() {
        assert!(sample_record().is_valid());

        let mut bad = sample_record();
        bad.close = f64::NAN;
        assert!(!bad.is_valid());

        let mut neg = sample_record();
        neg.low = -1.0;
        assert!(!neg.is_valid());
    }

    #[test]
    fn series_date_span() {
        let key = SeriesKey::new("petr4", "PETR4");
        let mut series = Series {
            key,
            source: "test".into(),
            records: vec![],
        };
        assert!(series.date_span().is_none());

        series.records.push(sample_record());
        let mut later = sample_record();
        later.date = NaiveDate::from_ymd_opt(2025, 10, 22).unwrap();
        series.records.push(later);

        let (first, last) = series.date_span().unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 10, 20).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 10, 22).unwrap());
    }

    #[test]
    fn record_serialization_roundtrip() {
        let rec = sample_record();
        let json = serde_json::to_string(&rec).unwrap();
        let back: DailyRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
