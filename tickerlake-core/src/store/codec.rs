//! Record ↔ Polars DataFrame conversion for the Parquet partition blobs.

use chrono::NaiveDate;
use polars::prelude::*;

use crate::domain::{
    AggregateStats, DailyRecord, MonthlyAggregate, PeriodAggregate, TransformedRecord,
};
use crate::store::StoreError;

fn codec_err(context: &'static str) -> impl Fn(PolarsError) -> StoreError {
    move |e| StoreError::Codec(format!("{context}: {e}"))
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

fn date_to_days(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

fn days_to_date(days: i32) -> NaiveDate {
    epoch() + chrono::Duration::days(days as i64)
}

fn date_column(name: &str, dates: Vec<i32>) -> Result<Column, StoreError> {
    Column::new(name.into(), dates)
        .cast(&DataType::Date)
        .map_err(codec_err("date cast"))
}

// ── daily records ───────────────────────────────────────────────────

pub fn daily_to_dataframe(rows: &[DailyRecord]) -> Result<DataFrame, StoreError> {
    let dates: Vec<i32> = rows.iter().map(|r| date_to_days(r.date)).collect();
    let opens: Vec<f64> = rows.iter().map(|r| r.open).collect();
    let highs: Vec<f64> = rows.iter().map(|r| r.high).collect();
    let lows: Vec<f64> = rows.iter().map(|r| r.low).collect();
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let volumes: Vec<u64> = rows.iter().map(|r| r.volume).collect();

    DataFrame::new(vec![
        date_column("date", dates)?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(codec_err("daily dataframe creation"))
}

pub fn dataframe_to_daily(df: &DataFrame) -> Result<Vec<DailyRecord>, StoreError> {
    let dates = df
        .column("date")
        .map_err(codec_err("date column"))?
        .date()
        .map_err(codec_err("date column type"))?;
    let opens = float_column(df, "open")?;
    let highs = float_column(df, "high")?;
    let lows = float_column(df, "low")?;
    let closes = float_column(df, "close")?;
    let volumes = df
        .column("volume")
        .map_err(codec_err("volume column"))?
        .u64()
        .map_err(codec_err("volume column type"))?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = dates
            .get(i)
            .ok_or_else(|| StoreError::Codec(format!("null date at row {i}")))?;
        rows.push(DailyRecord {
            date: days_to_date(days),
            open: required(opens.get(i), "open", i)?,
            high: required(highs.get(i), "high", i)?,
            low: required(lows.get(i), "low", i)?,
            close: required(closes.get(i), "close", i)?,
            volume: volumes
                .get(i)
                .ok_or_else(|| StoreError::Codec(format!("null volume at row {i}")))?,
        });
    }
    Ok(rows)
}

// ── transformed records ─────────────────────────────────────────────

pub fn transformed_to_dataframe(rows: &[TransformedRecord]) -> Result<DataFrame, StoreError> {
    let dates: Vec<i32> = rows.iter().map(|r| date_to_days(r.date)).collect();
    let opens: Vec<f64> = rows.iter().map(|r| r.open).collect();
    let highs: Vec<f64> = rows.iter().map(|r| r.high).collect();
    let lows: Vec<f64> = rows.iter().map(|r| r.low).collect();
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let volumes: Vec<u64> = rows.iter().map(|r| r.volume).collect();
    let close_ma5: Vec<f64> = rows.iter().map(|r| r.close_ma5).collect();
    let volume_ma5: Vec<f64> = rows.iter().map(|r| r.volume_ma5).collect();
    let prev_closes: Vec<Option<f64>> = rows.iter().map(|r| r.prev_close).collect();
    let pct_changes: Vec<Option<f64>> = rows.iter().map(|r| r.pct_change).collect();
    let day_indexes: Vec<i64> = rows.iter().map(|r| r.day_index).collect();

    DataFrame::new(vec![
        date_column("date", dates)?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
        Column::new("close_ma5".into(), close_ma5),
        Column::new("volume_ma5".into(), volume_ma5),
        Column::new("prev_close".into(), prev_closes),
        Column::new("pct_change".into(), pct_changes),
        Column::new("day_index".into(), day_indexes),
    ])
    .map_err(codec_err("transformed dataframe creation"))
}

pub fn dataframe_to_transformed(df: &DataFrame) -> Result<Vec<TransformedRecord>, StoreError> {
    let dates = df
        .column("date")
        .map_err(codec_err("date column"))?
        .date()
        .map_err(codec_err("date column type"))?;
    let opens = float_column(df, "open")?;
    let highs = float_column(df, "high")?;
    let lows = float_column(df, "low")?;
    let closes = float_column(df, "close")?;
    let volumes = df
        .column("volume")
        .map_err(codec_err("volume column"))?
        .u64()
        .map_err(codec_err("volume column type"))?;
    let close_ma5 = float_column(df, "close_ma5")?;
    let volume_ma5 = float_column(df, "volume_ma5")?;
    let prev_closes = float_column(df, "prev_close")?;
    let pct_changes = float_column(df, "pct_change")?;
    let day_indexes = df
        .column("day_index")
        .map_err(codec_err("day_index column"))?
        .i64()
        .map_err(codec_err("day_index column type"))?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = dates
            .get(i)
            .ok_or_else(|| StoreError::Codec(format!("null date at row {i}")))?;
        rows.push(TransformedRecord {
            date: days_to_date(days),
            open: required(opens.get(i), "open", i)?,
            high: required(highs.get(i), "high", i)?,
            low: required(lows.get(i), "low", i)?,
            close: required(closes.get(i), "close", i)?,
            volume: volumes
                .get(i)
                .ok_or_else(|| StoreError::Codec(format!("null volume at row {i}")))?,
            close_ma5: required(close_ma5.get(i), "close_ma5", i)?,
            volume_ma5: required(volume_ma5.get(i), "volume_ma5", i)?,
            prev_close: prev_closes.get(i),
            pct_change: pct_changes.get(i),
            day_index: day_indexes
                .get(i)
                .ok_or_else(|| StoreError::Codec(format!("null day_index at row {i}")))?,
        });
    }
    Ok(rows)
}

// ── rollups ─────────────────────────────────────────────────────────

/// One-row frame for a monthly rollup partition.
pub fn monthly_to_dataframe(agg: &MonthlyAggregate) -> Result<DataFrame, StoreError> {
    let mut columns = vec![
        Column::new("ticker".into(), vec![agg.ticker.clone()]),
        Column::new("year".into(), vec![agg.year]),
        Column::new("month".into(), vec![agg.month]),
        Column::new("period".into(), vec![agg.period()]),
    ];
    columns.extend(stats_columns(&agg.stats)?);
    DataFrame::new(columns).map_err(codec_err("monthly dataframe creation"))
}

/// One-row frame for the full-period summary partition.
pub fn period_to_dataframe(agg: &PeriodAggregate) -> Result<DataFrame, StoreError> {
    let mut columns = vec![Column::new("ticker".into(), vec![agg.ticker.clone()])];
    columns.extend(stats_columns(&agg.stats)?);
    DataFrame::new(columns).map_err(codec_err("summary dataframe creation"))
}

fn stats_columns(stats: &AggregateStats) -> Result<Vec<Column>, StoreError> {
    Ok(vec![
        Column::new("trading_days".into(), vec![stats.trading_days]),
        Column::new("close_mean".into(), vec![stats.close_mean]),
        Column::new("close_min".into(), vec![stats.close_min]),
        Column::new("close_max".into(), vec![stats.close_max]),
        Column::new("volume_sum".into(), vec![stats.volume_sum]),
        Column::new("volume_mean".into(), vec![stats.volume_mean]),
        Column::new("close_stddev".into(), vec![stats.close_stddev]),
        date_column("first_date", vec![date_to_days(stats.first_date)])?,
        date_column("last_date", vec![date_to_days(stats.last_date)])?,
    ])
}

// ── helpers ─────────────────────────────────────────────────────────

fn float_column<'a>(
    df: &'a DataFrame,
    name: &str,
) -> Result<&'a ChunkedArray<Float64Type>, StoreError> {
    df.column(name)
        .map_err(|e| StoreError::Codec(format!("{name} column: {e}")))?
        .f64()
        .map_err(|e| StoreError::Codec(format!("{name} column type: {e}")))
}

fn required(value: Option<f64>, name: &str, row: usize) -> Result<f64, StoreError> {
    value.ok_or_else(|| StoreError::Codec(format!("null {name} at row {row}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily(date: NaiveDate, close: f64) -> DailyRecord {
        DailyRecord {
            date,
            open: close - 0.3,
            high: close + 0.4,
            low: close - 0.6,
            close,
            volume: 42_000_000,
        }
    }

    #[test]
    fn daily_roundtrip() {
        let rows = vec![
            daily(NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(), 36.9),
            daily(NaiveDate::from_ymd_opt(2025, 10, 21).unwrap(), 37.2),
        ];
        let df = daily_to_dataframe(&rows).unwrap();
        assert_eq!(df.height(), 2);
        let back = dataframe_to_daily(&df).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn transformed_roundtrip_preserves_nulls() {
        let rows = vec![
            TransformedRecord {
                date: NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
                open: 36.6,
                high: 37.3,
                low: 36.3,
                close: 36.9,
                volume: 42_000_000,
                close_ma5: 36.9,
                volume_ma5: 42_000_000.0,
                prev_close: None,
                pct_change: None,
                day_index: 0,
            },
            TransformedRecord {
                date: NaiveDate::from_ymd_opt(2025, 10, 21).unwrap(),
                open: 36.9,
                high: 37.5,
                low: 36.8,
                close: 37.2,
                volume: 40_000_000,
                close_ma5: 37.05,
                volume_ma5: 41_000_000.0,
                prev_close: Some(36.9),
                pct_change: Some(0.813_008_130_081_306),
                day_index: 1,
            },
        ];
        let df = transformed_to_dataframe(&rows).unwrap();
        let back = dataframe_to_transformed(&df).unwrap();
        assert_eq!(back, rows);
        assert!(back[0].prev_close.is_none());
        assert!(back[0].pct_change.is_none());
    }

    #[test]
    fn monthly_frame_has_null_stddev_for_single_day() {
        let agg = MonthlyAggregate {
            ticker: "petr4".into(),
            year: 2025,
            month: 10,
            stats: AggregateStats {
                trading_days: 1,
                close_mean: 36.9,
                close_min: 36.9,
                close_max: 36.9,
                volume_sum: 42_000_000,
                volume_mean: 42_000_000.0,
                close_stddev: None,
                first_date: NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
                last_date: NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
            },
        };
        let df = monthly_to_dataframe(&agg).unwrap();
        assert_eq!(df.height(), 1);
        let stddev = df.column("close_stddev").unwrap().f64().unwrap();
        assert!(stddev.get(0).is_none());
        let period = df.column("period").unwrap().str().unwrap();
        assert_eq!(period.get(0), Some("2025-10"));
    }
}
