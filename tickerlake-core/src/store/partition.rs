//! Partition keys and their Hive-style object paths.
//!
//! Key grammar:
//! - daily layers: `<raw|refined>/dataset=<d>/ticker=<t>/year=<Y>/month=<MM>/day=<DD>/data.parquet`
//! - monthly rollup: `refined/monthly/ticker=<t>/year=<Y>/month=<MM>/data.parquet`
//! - period rollup: `refined/summary/ticker=<t>/data.parquet`
//!
//! Monthly/summary keys carry no `dataset=` segment (the rollup is scoped
//! per dataset by the caller) and cannot collide with the daily keys.

use chrono::{Datelike, NaiveDate};

/// Storage layer for daily partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// As-acquired records, written by the ingestion stage.
    Raw,
    /// Transformed records, fully recomputed on each refine run.
    Refined,
}

impl Layer {
    pub fn prefix(&self) -> &'static str {
        match self {
            Layer::Raw => "raw",
            Layer::Refined => "refined",
        }
    }
}

/// Key of one daily partition: (layer, dataset, ticker, date).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyPartitionKey {
    pub layer: Layer,
    pub dataset: String,
    pub ticker: String,
    pub date: NaiveDate,
}

impl DailyPartitionKey {
    pub fn new(layer: Layer, dataset: &str, ticker: &str, date: NaiveDate) -> Self {
        Self {
            layer,
            dataset: dataset.to_string(),
            ticker: ticker.to_string(),
            date,
        }
    }

    /// Directory of the whole series under this layer.
    pub fn series_prefix(layer: Layer, dataset: &str, ticker: &str) -> String {
        format!("{}/dataset={dataset}/ticker={ticker}", layer.prefix())
    }

    /// Full object key of the partition blob.
    pub fn object_key(&self) -> String {
        format!(
            "{}/year={}/month={:02}/day={:02}/data.parquet",
            Self::series_prefix(self.layer, &self.dataset, &self.ticker),
            self.date.year(),
            self.date.month(),
            self.date.day(),
        )
    }
}

/// Key of a monthly rollup partition: (ticker, year, month).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyPartitionKey {
    pub ticker: String,
    pub year: i32,
    pub month: u32,
}

impl MonthlyPartitionKey {
    pub fn object_key(&self) -> String {
        format!(
            "refined/monthly/ticker={}/year={}/month={:02}/data.parquet",
            self.ticker, self.year, self.month
        )
    }
}

/// Key of the full-period summary partition: (ticker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryPartitionKey {
    pub ticker: String,
}

impl SummaryPartitionKey {
    pub fn object_key(&self) -> String {
        format!("refined/summary/ticker={}/data.parquet", self.ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_key_layout() {
        let key = DailyPartitionKey::new(
            Layer::Raw,
            "petr4",
            "petr4",
            NaiveDate::from_ymd_opt(2025, 10, 7).unwrap(),
        );
        assert_eq!(
            key.object_key(),
            "raw/dataset=petr4/ticker=petr4/year=2025/month=10/day=07/data.parquet"
        );
    }

    #[test]
    fn refined_key_layout() {
        let key = DailyPartitionKey::new(
            Layer::Refined,
            "petr4",
            "petr4",
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        );
        assert_eq!(
            key.object_key(),
            "refined/dataset=petr4/ticker=petr4/year=2025/month=01/day=02/data.parquet"
        );
    }

    #[test]
    fn monthly_key_layout() {
        let key = MonthlyPartitionKey {
            ticker: "petr4".into(),
            year: 2025,
            month: 3,
        };
        assert_eq!(
            key.object_key(),
            "refined/monthly/ticker=petr4/year=2025/month=03/data.parquet"
        );
    }

    #[test]
    fn summary_key_layout() {
        let key = SummaryPartitionKey {
            ticker: "petr4".into(),
        };
        assert_eq!(key.object_key(), "refined/summary/ticker=petr4/data.parquet");
    }

    #[test]
    fn same_date_maps_to_same_key() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 7).unwrap();
        let a = DailyPartitionKey::new(Layer::Raw, "petr4", "petr4", date);
        let b = DailyPartitionKey::new(Layer::Raw, "petr4", "petr4", date);
        assert_eq!(a.object_key(), b.object_key());
    }
}
