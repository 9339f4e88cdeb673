//! TickerLake Core — partitioned OHLCV ingestion and derivation engine.
//!
//! This crate contains the heart of the pipeline:
//! - Domain records (daily bars, derived rows, monthly/period rollups)
//! - Source providers behind one trait, with an ordered-fallback
//!   acquisition coordinator (bounded retry, exponential backoff)
//! - Partition store adapter (Hive-style keys, atomic Parquet writes)
//! - Windowed transform engine (trailing means, day-over-day variation)
//! - Aggregation engine (monthly and full-period rollups)

pub mod cancel;
pub mod domain;
pub mod source;
pub mod store;
pub mod transform;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types that cross the batch fan-out boundary are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::DailyRecord>();
        require_sync::<domain::DailyRecord>();
        require_send::<domain::Series>();
        require_sync::<domain::Series>();
        require_send::<domain::TransformedRecord>();
        require_sync::<domain::TransformedRecord>();
        require_send::<domain::MonthlyAggregate>();
        require_sync::<domain::MonthlyAggregate>();
        require_send::<domain::PeriodAggregate>();
        require_sync::<domain::PeriodAggregate>();

        require_send::<cancel::CancelToken>();
        require_sync::<cancel::CancelToken>();

        require_send::<store::PartitionStore>();
        require_sync::<store::PartitionStore>();

        require_send::<source::AcquisitionCoordinator>();
        require_sync::<source::AcquisitionCoordinator>();
    }
}
