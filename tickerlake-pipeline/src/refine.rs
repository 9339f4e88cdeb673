//! Refine run: raw read → transform → aggregate → refined partitioned write.
//!
//! The refined layer is a pure cache of the transform/aggregate stage over
//! the current raw data: every run recomputes it from scratch and
//! overwrites the affected partitions. Re-running over unchanged raw data
//! reproduces bit-identical outputs.

use tracing::{info, warn};

use tickerlake_core::domain::{PeriodAggregate, SeriesKey};
use tickerlake_core::store::{DailyPartitionKey, Layer, PartitionStore, StoreError};
use tickerlake_core::transform::{aggregate_monthly, aggregate_period};

use crate::catalog::CatalogNotifier;
use crate::{PipelineConfig, PipelineError};

/// Outcome of one refine run.
#[derive(Debug, Clone, PartialEq)]
pub struct RefineReport {
    pub dataset: String,
    pub ticker: String,
    pub daily_written: usize,
    pub monthly_groups: usize,
    pub period_summary: PeriodAggregate,
}

/// Transform and aggregate one (dataset, ticker) from its raw partitions.
pub fn run_refine(
    config: &PipelineConfig,
    store: &PartitionStore,
    ticker: &str,
    dataset: &str,
    notifier: &dyn CatalogNotifier,
) -> Result<RefineReport, PipelineError> {
    let key = SeriesKey::new(dataset, ticker);

    info!(ticker = %key.ticker, dataset = %key.dataset, "starting refine run");

    // Adapter returns the union in no particular order; the transform
    // engine owns the sort and the duplicate-date check.
    let raw = store.read_all_daily(&key.dataset, &key.ticker)?;
    let transformed = config.window_transform().transform(raw)?;

    let Some(period_summary) = aggregate_period(&key.ticker, &transformed) else {
        return Err(PipelineError::Store(StoreError::NoPartitions {
            dataset: key.dataset,
            ticker: key.ticker,
        }));
    };

    let mut daily_written = 0usize;
    for record in &transformed {
        let partition =
            DailyPartitionKey::new(Layer::Refined, &key.dataset, &key.ticker, record.date);
        store.write_transformed(&partition, std::slice::from_ref(record))?;
        daily_written += 1;
    }

    let monthly = aggregate_monthly(&key.ticker, &transformed);
    for aggregate in &monthly {
        store.write_monthly(aggregate)?;
    }
    store.write_summary(&period_summary)?;

    info!(
        ticker = %key.ticker,
        daily = daily_written,
        monthly = monthly.len(),
        "refine run complete"
    );

    // Downstream catalog refresh is best-effort by contract: the refined
    // data is already durable, so a notify failure must not fail the run.
    if let Err(e) = notifier.refresh(&config.catalog_name) {
        warn!(error = %e, "catalog refresh failed; continuing");
    }

    Ok(RefineReport {
        dataset: key.dataset,
        ticker: key.ticker,
        daily_written,
        monthly_groups: monthly.len(),
        period_summary,
    })
}
