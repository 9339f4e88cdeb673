//! Record normalizer: provider-native rows to the canonical daily schema.
//!
//! Coercion failure on a row drops that row (with a warning) rather than
//! aborting the batch; rows missing any required field are excluded, never
//! defaulted. A duplicate date inside one provider batch violates the
//! one-row-per-date invariant and rejects the whole batch as schema-invalid.

use chrono::{DateTime, NaiveDate};
use tracing::warn;

use crate::domain::{DailyRecord, Series, SeriesKey};
use crate::source::provider::{FetchError, RawQuote};

/// Canonicalize a provider batch into a `Series`.
///
/// Output records are sorted ascending by date and satisfy every
/// `DailyRecord` invariant: prices finite and ≥ 0, volume a non-negative
/// integer, at most one row per date.
pub fn normalize(
    key: &SeriesKey,
    source: &str,
    quotes: &[RawQuote],
) -> Result<Series, FetchError> {
    let mut records: Vec<DailyRecord> = Vec::with_capacity(quotes.len());
    let mut dropped = 0usize;

    for quote in quotes {
        match coerce(quote) {
            Some(record) => records.push(record),
            None => {
                dropped += 1;
                warn!(
                    ticker = %key.ticker,
                    source,
                    epoch_secs = quote.epoch_secs,
                    "dropping row that failed coercion to the daily schema"
                );
            }
        }
    }

    if dropped > 0 {
        warn!(
            ticker = %key.ticker,
            source,
            dropped,
            kept = records.len(),
            "normalization dropped invalid rows"
        );
    }

    records.sort_by_key(|r| r.date);

    if let Some(dup) = first_duplicate_date(&records) {
        return Err(FetchError::SchemaInvalid(format!(
            "provider returned date {dup} more than once"
        )));
    }

    Ok(Series {
        key: key.clone(),
        source: source.to_string(),
        records,
    })
}

/// Coerce one provider row, or `None` if any required field is missing or
/// out of domain.
fn coerce(quote: &RawQuote) -> Option<DailyRecord> {
    let date = epoch_to_date(quote.epoch_secs)?;
    let open = price(quote.open)?;
    let high = price(quote.high)?;
    let low = price(quote.low)?;
    let close = price(quote.close)?;
    let volume = volume(quote.volume)?;

    Some(DailyRecord {
        date,
        open,
        high,
        low,
        close,
        volume,
    })
}

fn epoch_to_date(epoch_secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(epoch_secs, 0).map(|dt| dt.naive_utc().date())
}

fn price(value: Option<f64>) -> Option<f64> {
    value.filter(|p| p.is_finite() && *p >= 0.0)
}

fn volume(value: Option<f64>) -> Option<u64> {
    let v = value?;
    if !v.is_finite() || v < 0.0 {
        return None;
    }
    Some(v.round() as u64)
}

fn first_duplicate_date(sorted: &[DailyRecord]) -> Option<NaiveDate> {
    sorted
        .windows(2)
        .find(|pair| pair[0].date == pair[1].date)
        .map(|pair| pair[0].date)
}
