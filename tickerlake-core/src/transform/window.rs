//! Windowed transform engine.
//!
//! Consumes all rows of one series (any order), sorts them by date, and
//! computes the order-dependent derived columns: trailing means of close
//! and volume over a row-count window, previous close, day-over-day
//! percent change, and a day index from a fixed anchor date.
//!
//! The window is row-count based, not calendar based — a weekend gap still
//! counts as one step. At the head of the series the window is simply
//! smaller (`rows[max(0, i−4) ..= i]`); that is expected, not an error.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{DailyRecord, TransformedRecord};

/// Anchor for the day-index column (the pipeline's fixed epoch).
pub fn default_anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 20).unwrap()
}

/// Trailing window length shared by the close and volume means.
const WINDOW: usize = 5;

/// A duplicate date within one series indicates upstream or storage
/// corruption; it is never silently resolved by picking a row.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("duplicate date {date} in series — refusing to pick a row")]
    DuplicateDate { date: NaiveDate },
}

/// The transform engine. Holds configuration only — no state survives an
/// invocation, so repeated runs over the same input are identical.
#[derive(Debug, Clone, Copy)]
pub struct WindowTransform {
    anchor: NaiveDate,
}

impl WindowTransform {
    pub fn new(anchor: NaiveDate) -> Self {
        Self { anchor }
    }

    /// Transform a full series. Input order does not matter; output is
    /// ascending by date.
    pub fn transform(
        &self,
        mut records: Vec<DailyRecord>,
    ) -> Result<Vec<TransformedRecord>, TransformError> {
        records.sort_by_key(|r| r.date);

        if let Some(pair) = records.windows(2).find(|p| p[0].date == p[1].date) {
            return Err(TransformError::DuplicateDate { date: pair[0].date });
        }

        let mut out = Vec::with_capacity(records.len());
        let mut close_sum = 0.0_f64;
        let mut volume_sum = 0.0_f64;

        for (i, record) in records.iter().enumerate() {
            close_sum += record.close;
            volume_sum += record.volume as f64;
            if i >= WINDOW {
                close_sum -= records[i - WINDOW].close;
                volume_sum -= records[i - WINDOW].volume as f64;
            }
            let width = (i + 1).min(WINDOW) as f64;

            let prev_close = if i > 0 { Some(records[i - 1].close) } else { None };
            let pct_change = match prev_close {
                Some(prev) if prev != 0.0 => Some((record.close - prev) / prev * 100.0),
                // Zero previous close: variation is undefined, not +∞ or 0.
                _ => None,
            };

            out.push(TransformedRecord {
                date: record.date,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
                close_ma5: close_sum / width,
                volume_ma5: volume_sum / width,
                prev_close,
                pct_change,
                day_index: (record.date - self.anchor).num_days(),
            });
        }

        Ok(out)
    }
}

impl Default for WindowTransform {
    fn default() -> Self {
        Self::new(default_anchor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    fn record(d: u32, close: f64, volume: u64) -> DailyRecord {
        DailyRecord {
            date: date(d),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    fn close_series(closes: &[f64]) -> Vec<DailyRecord> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| record(20 + i as u32, c, 1000 + i as u64))
            .collect()
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
    }

    #[test]
    fn worked_percent_change_example() {
        // Closes [10, 11, 9, 9, 12] over 5 consecutive days.
        let out = WindowTransform::default()
            .transform(close_series(&[10.0, 11.0, 9.0, 9.0, 12.0]))
            .unwrap();

        assert_eq!(out[0].pct_change, None);
        approx(out[1].pct_change.unwrap(), 10.0);
        approx(
            out[2].pct_change.unwrap(),
            (9.0 - 11.0) / 11.0 * 100.0, // −18.18 at 2 decimals
        );
        approx(out[3].pct_change.unwrap(), 0.0);
        approx(out[4].pct_change.unwrap(), (12.0 - 9.0) / 9.0 * 100.0); // +33.33

        // Trailing 5-row average on the 5th day.
        approx(out[4].close_ma5, 10.2);
    }

    #[test]
    fn first_row_has_null_prev_and_pct() {
        let out = WindowTransform::default()
            .transform(close_series(&[10.0, 11.0]))
            .unwrap();
        assert_eq!(out[0].prev_close, None);
        assert_eq!(out[0].pct_change, None);
        assert_eq!(out[1].prev_close, Some(10.0));
    }

    #[test]
    fn window_expands_at_series_head() {
        let out = WindowTransform::default()
            .transform(close_series(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0]))
            .unwrap();

        approx(out[0].close_ma5, 10.0); // window of 1
        approx(out[1].close_ma5, 15.0); // window of 2
        approx(out[2].close_ma5, 20.0); // window of 3
        approx(out[4].close_ma5, 30.0); // first full window
        approx(out[5].close_ma5, 40.0); // window slides
        approx(out[6].close_ma5, 50.0);
    }

    #[test]
    fn volume_window_mirrors_close_window() {
        let records = vec![
            record(20, 10.0, 100),
            record(21, 10.0, 200),
            record(22, 10.0, 600),
        ];
        let out = WindowTransform::default().transform(records).unwrap();
        approx(out[0].volume_ma5, 100.0);
        approx(out[1].volume_ma5, 150.0);
        approx(out[2].volume_ma5, 300.0);
    }

    #[test]
    fn zero_previous_close_is_undefined_variation() {
        let out = WindowTransform::default()
            .transform(close_series(&[0.0, 5.0]))
            .unwrap();
        assert_eq!(out[1].prev_close, Some(0.0));
        assert_eq!(out[1].pct_change, None);
    }

    #[test]
    fn unsorted_input_is_sorted_by_date() {
        let mut records = close_series(&[10.0, 11.0, 12.0]);
        records.reverse();
        let out = WindowTransform::default().transform(records).unwrap();
        assert_eq!(out[0].close, 10.0);
        assert_eq!(out[2].close, 12.0);
        assert!(out.windows(2).all(|p| p[0].date < p[1].date));
    }

    #[test]
    fn duplicate_date_is_an_error() {
        let mut records = close_series(&[10.0, 11.0]);
        records.push(record(21, 99.0, 5));
        let err = WindowTransform::default().transform(records).unwrap_err();
        assert_eq!(err, TransformError::DuplicateDate { date: date(21) });
    }

    #[test]
    fn gaps_count_as_single_rows() {
        // Friday, then Monday — the gap does not widen the window.
        let records = vec![record(24, 10.0, 100), record(27, 20.0, 100)];
        let out = WindowTransform::default().transform(records).unwrap();
        approx(out[1].close_ma5, 15.0);
        approx(out[1].pct_change.unwrap(), 100.0);
    }

    #[test]
    fn day_index_relative_to_anchor() {
        let transform = WindowTransform::new(date(22));
        let out = transform
            .transform(close_series(&[10.0, 11.0, 12.0]))
            .unwrap();
        assert_eq!(out[0].day_index, -2); // 10-20 precedes the anchor
        assert_eq!(out[1].day_index, -1);
        assert_eq!(out[2].day_index, 0);
    }

    #[test]
    fn empty_series_transforms_to_empty() {
        let out = WindowTransform::default().transform(Vec::new()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn transform_is_idempotent() {
        let records = close_series(&[10.0, 11.0, 9.0, 9.0, 12.0]);
        let a = WindowTransform::default().transform(records.clone()).unwrap();
        let b = WindowTransform::default().transform(records).unwrap();
        assert_eq!(a, b);
    }
}
