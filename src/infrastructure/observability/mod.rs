//! Push-based observability for MarketPulse
//!
//! Metrics are kept in a Prometheus registry and pushed out as periodic
//! structured JSON lines on stdout. Nothing listens for incoming requests.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::{MetricsReporter, MetricsSnapshot};
