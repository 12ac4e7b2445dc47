//! Observability for credential providers.
//!
//! - **Spans**: every file refresh runs inside a `credentials.refresh` span
//!   recording provider, outcome and latency.
//! - **Metrics**: atomic counters per provider for refreshes, filesystem
//!   events, watch errors and change signals.

mod metrics;
mod spans;

pub use metrics::{Counter, Gauge, WatchMetrics, WatchMetricsSummary};
pub use spans::RefreshSpan;
