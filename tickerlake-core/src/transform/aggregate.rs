//! Aggregation engine: monthly and full-period rollups.
//!
//! Rollups are recomputed from scratch on every run — there is no
//! incremental merge — so re-running over an unchanged series reproduces
//! bit-identical values. Monthly groups are collected in a BTreeMap to keep
//! output order deterministic.

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::domain::{AggregateStats, MonthlyAggregate, PeriodAggregate, TransformedRecord};

/// One monthly rollup per (year, month) present in the series, in
/// ascending key order. Input must be sorted ascending by date (the
/// transform engine's output); first/last dates fall out of group order.
pub fn aggregate_monthly(ticker: &str, series: &[TransformedRecord]) -> Vec<MonthlyAggregate> {
    let mut groups: BTreeMap<(i32, u32), Vec<&TransformedRecord>> = BTreeMap::new();
    for record in series {
        groups
            .entry((record.date.year(), record.date.month()))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|((year, month), rows)| MonthlyAggregate {
            ticker: ticker.to_string(),
            year,
            month,
            stats: stats(&rows),
        })
        .collect()
}

/// Single rollup over the full series. `None` for an empty series.
pub fn aggregate_period(ticker: &str, series: &[TransformedRecord]) -> Option<PeriodAggregate> {
    if series.is_empty() {
        return None;
    }
    let rows: Vec<&TransformedRecord> = series.iter().collect();
    Some(PeriodAggregate {
        ticker: ticker.to_string(),
        stats: stats(&rows),
    })
}

/// Reducing functions over one non-empty group.
fn stats(rows: &[&TransformedRecord]) -> AggregateStats {
    let n = rows.len();
    let close_sum: f64 = rows.iter().map(|r| r.close).sum();
    let close_mean = close_sum / n as f64;

    let mut close_min = f64::INFINITY;
    let mut close_max = f64::NEG_INFINITY;
    for row in rows {
        close_min = close_min.min(row.close);
        close_max = close_max.max(row.close);
    }

    let volume_sum: u64 = rows.iter().map(|r| r.volume).sum();
    let volume_mean = volume_sum as f64 / n as f64;

    // Sample (N−1) standard deviation; undefined below 2 rows.
    let close_stddev = if n >= 2 {
        let variance = rows
            .iter()
            .map(|r| {
                let d = r.close - close_mean;
                d * d
            })
            .sum::<f64>()
            / (n - 1) as f64;
        Some(variance.sqrt())
    } else {
        None
    };

    AggregateStats {
        trading_days: n as u32,
        close_mean,
        close_min,
        close_max,
        volume_sum,
        volume_mean,
        close_stddev,
        first_date: rows[0].date,
        last_date: rows[n - 1].date,
    }
}
