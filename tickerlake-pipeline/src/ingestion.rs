//! Ingestion run: acquire → normalize → raw partitioned write.
//!
//! One run covers one (dataset, ticker). Each acquired day lands in its own
//! raw partition; re-ingesting a day replaces its partition rather than
//! duplicating it. The provenance sidecar is written last, after every
//! partition landed.

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::info;

use tickerlake_core::cancel::CancelToken;
use tickerlake_core::domain::SeriesKey;
use tickerlake_core::source::{AcquisitionCoordinator, DateRange};
use tickerlake_core::store::{DailyPartitionKey, Layer, PartitionStore, SeriesMeta};

use crate::PipelineError;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub dataset: String,
    pub ticker: String,
    /// Provider that won the fallback.
    pub source: String,
    pub records_written: usize,
    pub partitions_written: usize,
}

/// Ingest one (dataset, ticker) over a lookback window ending at `end`.
pub fn run_ingestion(
    store: &PartitionStore,
    coordinator: &AcquisitionCoordinator,
    ticker: &str,
    dataset: &str,
    lookback_days: u32,
    end: NaiveDate,
    cancel: &CancelToken,
) -> Result<IngestionReport, PipelineError> {
    let key = SeriesKey::new(dataset, ticker);
    let start = end - chrono::Duration::days(i64::from(lookback_days.saturating_sub(1)));
    let range = DateRange::new(start, end);

    info!(
        ticker = %key.ticker,
        dataset = %key.dataset,
        %start,
        %end,
        "starting ingestion run"
    );

    let series = coordinator.acquire(&key, range)?;

    let mut partitions_written = 0usize;
    for record in &series.records {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let partition = DailyPartitionKey::new(Layer::Raw, &key.dataset, &key.ticker, record.date);
        store.write_daily(&partition, std::slice::from_ref(record))?;
        partitions_written += 1;
    }

    if let Some(meta) = SeriesMeta::for_series(&series) {
        store.write_series_meta(&meta)?;
    }

    info!(
        ticker = %key.ticker,
        source = %series.source,
        records = series.len(),
        partitions = partitions_written,
        "ingestion run complete"
    );

    let records_written = series.len();
    Ok(IngestionReport {
        dataset: key.dataset,
        ticker: key.ticker,
        source: series.source,
        records_written,
        partitions_written,
    })
}

/// Ingest several tickers in parallel.
///
/// Runs are independent — partition keys are disjoint per ticker and the
/// store is the only shared resource — so the fan-out carries no shared
/// mutable state. The per-run lookback and end date are common.
#[allow(clippy::too_many_arguments)]
pub fn run_ingestion_batch(
    store: &PartitionStore,
    coordinator: &AcquisitionCoordinator,
    tickers: &[String],
    dataset: Option<&str>,
    lookback_days: u32,
    end: NaiveDate,
    cancel: &CancelToken,
) -> Vec<(String, Result<IngestionReport, PipelineError>)> {
    tickers
        .par_iter()
        .map(|ticker| {
            // Dataset defaults to the normalized ticker itself.
            let dataset = dataset
                .map(str::to_string)
                .unwrap_or_else(|| tickerlake_core::domain::normalize_ticker(ticker));
            let result = run_ingestion(
                store,
                coordinator,
                ticker,
                &dataset,
                lookback_days,
                end,
                cancel,
            );
            (ticker.clone(), result)
        })
        .collect()
}
