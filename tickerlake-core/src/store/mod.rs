//! Partition store adapter: Hive-partitioned Parquet blobs on a local root.
//!
//! The adapter maps partition keys to object paths and owns the only I/O in
//! the pipeline. Writes are atomic per partition (Parquet to `*.tmp`, then
//! rename into place) and idempotent: writing the same key again replaces
//! the prior content exactly — no append, no duplication across re-runs.
//! Reads return the union of a series' daily partitions; ordering is the
//! transform engine's responsibility, not the adapter's.

pub mod codec;
pub mod partition;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{DailyRecord, MonthlyAggregate, PeriodAggregate, Series, TransformedRecord};

pub use partition::{DailyPartitionKey, Layer, MonthlyPartitionKey, SummaryPartitionKey};

/// Storage failures. A failed write never leaves a partially-written
/// partition visible; partitions already written remain valid.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("partition write failed for '{key}': {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("partition read failed for '{path}': {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("parquet codec error: {0}")]
    Codec(String),

    #[error("no raw partitions for dataset '{dataset}' ticker '{ticker}'")]
    NoPartitions { dataset: String, ticker: String },
}

/// Provenance sidecar written once per series after a raw ingestion.
///
/// Never read by the refine stage — refined outputs stay a pure function of
/// partition contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesMeta {
    pub dataset: String,
    pub ticker: String,
    pub record_count: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// BLAKE3 over the serialized records.
    pub data_hash: String,
    /// Provider that produced the data.
    pub source: String,
}

impl SeriesMeta {
    /// Build the sidecar for an acquired series. `None` for an empty series.
    pub fn for_series(series: &Series) -> Option<Self> {
        let (start_date, end_date) = series.date_span()?;
        let bytes = serde_json::to_vec(&series.records).ok()?;
        Some(Self {
            dataset: series.key.dataset.clone(),
            ticker: series.key.ticker.clone(),
            record_count: series.len(),
            start_date,
            end_date,
            data_hash: blake3::hash(&bytes).to_hex().to_string(),
            source: series.source.clone(),
        })
    }
}

/// The partition store, rooted at a local directory.
pub struct PartitionStore {
    root: PathBuf,
}

impl PartitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    // ── writes ──────────────────────────────────────────────────────

    /// Write one raw daily partition. Full overwrite of the key.
    pub fn write_daily(
        &self,
        key: &DailyPartitionKey,
        rows: &[DailyRecord],
    ) -> Result<(), StoreError> {
        let df = codec::daily_to_dataframe(rows)?;
        self.write_blob(&key.object_key(), df)
    }

    /// Write one refined daily partition. Full overwrite of the key.
    pub fn write_transformed(
        &self,
        key: &DailyPartitionKey,
        rows: &[TransformedRecord],
    ) -> Result<(), StoreError> {
        let df = codec::transformed_to_dataframe(rows)?;
        self.write_blob(&key.object_key(), df)
    }

    /// Write one monthly rollup partition.
    pub fn write_monthly(&self, agg: &MonthlyAggregate) -> Result<(), StoreError> {
        let key = MonthlyPartitionKey {
            ticker: agg.ticker.clone(),
            year: agg.year,
            month: agg.month,
        };
        let df = codec::monthly_to_dataframe(agg)?;
        self.write_blob(&key.object_key(), df)
    }

    /// Write the full-period summary partition.
    pub fn write_summary(&self, agg: &PeriodAggregate) -> Result<(), StoreError> {
        let key = SummaryPartitionKey {
            ticker: agg.ticker.clone(),
        };
        let df = codec::period_to_dataframe(agg)?;
        self.write_blob(&key.object_key(), df)
    }

    /// Write the series provenance sidecar under the raw layer.
    pub fn write_series_meta(&self, meta: &SeriesMeta) -> Result<(), StoreError> {
        let prefix = DailyPartitionKey::series_prefix(Layer::Raw, &meta.dataset, &meta.ticker);
        let path = self.object_path(&format!("{prefix}/_meta.json"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::WriteFailed {
                key: prefix.clone(),
                reason: format!("failed to create dir: {e}"),
            })?;
        }
        let json = serde_json::to_string_pretty(meta).map_err(|e| StoreError::WriteFailed {
            key: prefix.clone(),
            reason: format!("meta serialization: {e}"),
        })?;
        fs::write(&path, json).map_err(|e| StoreError::WriteFailed {
            key: prefix,
            reason: format!("meta write: {e}"),
        })
    }

    /// Load the series sidecar, if one exists.
    pub fn read_series_meta(&self, dataset: &str, ticker: &str) -> Option<SeriesMeta> {
        let prefix = DailyPartitionKey::series_prefix(Layer::Raw, dataset, ticker);
        let path = self.object_path(&format!("{prefix}/_meta.json"));
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    // ── reads ───────────────────────────────────────────────────────

    /// Union of all raw daily partitions for a series. Order unspecified.
    pub fn read_all_daily(&self, dataset: &str, ticker: &str) -> Result<Vec<DailyRecord>, StoreError> {
        let blobs = self.collect_blobs(Layer::Raw, dataset, ticker)?;
        if blobs.is_empty() {
            return Err(StoreError::NoPartitions {
                dataset: dataset.to_string(),
                ticker: ticker.to_string(),
            });
        }

        let mut rows = Vec::new();
        for path in blobs {
            let df = read_parquet(&path)?;
            rows.extend(codec::dataframe_to_daily(&df)?);
        }
        Ok(rows)
    }

    /// Union of all refined daily partitions for a series. Order unspecified.
    pub fn read_all_transformed(
        &self,
        dataset: &str,
        ticker: &str,
    ) -> Result<Vec<TransformedRecord>, StoreError> {
        let blobs = self.collect_blobs(Layer::Refined, dataset, ticker)?;
        let mut rows = Vec::new();
        for path in blobs {
            let df = read_parquet(&path)?;
            rows.extend(codec::dataframe_to_transformed(&df)?);
        }
        Ok(rows)
    }

    /// Number of daily partition blobs present for a series.
    pub fn count_partitions(&self, layer: Layer, dataset: &str, ticker: &str) -> usize {
        self.collect_blobs(layer, dataset, ticker)
            .map(|blobs| blobs.len())
            .unwrap_or(0)
    }

    // ── internals ───────────────────────────────────────────────────

    /// All-or-nothing blob write: Parquet to `*.tmp`, then atomic rename.
    fn write_blob(&self, key: &str, mut df: DataFrame) -> Result<(), StoreError> {
        let path = self.object_path(key);
        let parent = path.parent().ok_or_else(|| StoreError::WriteFailed {
            key: key.to_string(),
            reason: "object key has no parent directory".into(),
        })?;
        fs::create_dir_all(parent).map_err(|e| StoreError::WriteFailed {
            key: key.to_string(),
            reason: format!("failed to create dir: {e}"),
        })?;

        let tmp_path = path.with_extension("parquet.tmp");
        let file = fs::File::create(&tmp_path).map_err(|e| StoreError::WriteFailed {
            key: key.to_string(),
            reason: format!("create temp file: {e}"),
        })?;

        if let Err(e) = ParquetWriter::new(file).finish(&mut df) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::WriteFailed {
                key: key.to_string(),
                reason: format!("write parquet: {e}"),
            });
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::WriteFailed {
                key: key.to_string(),
                reason: format!("atomic rename failed: {e}"),
            }
        })?;

        debug!(key, rows = df.height(), "partition written");
        Ok(())
    }

    /// Collect `data.parquet` blobs under one series prefix.
    fn collect_blobs(
        &self,
        layer: Layer,
        dataset: &str,
        ticker: &str,
    ) -> Result<Vec<PathBuf>, StoreError> {
        let prefix = DailyPartitionKey::series_prefix(layer, dataset, ticker);
        let dir = self.object_path(&prefix);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut blobs = Vec::new();
        walk_blobs(&dir, &mut blobs).map_err(|e| StoreError::ReadFailed {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(blobs)
    }
}

fn walk_blobs(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_blobs(&path, out)?;
        } else if path.file_name().and_then(|n| n.to_str()) == Some("data.parquet") {
            out.push(path);
        }
    }
    Ok(())
}

fn read_parquet(path: &Path) -> Result<DataFrame, StoreError> {
    let file = fs::File::open(path).map_err(|e| StoreError::ReadFailed {
        path: path.display().to_string(),
        reason: format!("open: {e}"),
    })?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| StoreError::ReadFailed {
            path: path.display().to_string(),
            reason: format!("read: {e}"),
        })
}
