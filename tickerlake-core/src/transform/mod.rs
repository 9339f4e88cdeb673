//! Derivation engines: windowed transform and rollup aggregation.

pub mod aggregate;
pub mod window;

pub use aggregate::{aggregate_monthly, aggregate_period};
pub use window::{default_anchor, TransformError, WindowTransform};
