//! Source acquisition: providers, normalization, and the fallback coordinator.

pub mod brapi;
pub mod coordinator;
pub mod normalize;
pub mod provider;
pub mod yahoo;

pub use brapi::BrapiSource;
pub use coordinator::{AcquireError, AcquisitionCoordinator, RetryPolicy, SourceFailure};
pub use normalize::normalize;
pub use provider::{DateRange, FetchError, QuoteSource, RawQuote};
pub use yahoo::YahooChartSource;
