//! Observability utilities.

mod metrics;
mod timing;

pub use metrics::{CrawlMetrics, MetricsSnapshot};
pub use timing::SpanTimer;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// Honors `RUST_LOG`, defaulting to `info`. Returns an error message if a
/// subscriber is already installed.
pub fn init_tracing(json: bool) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().try_init().map_err(|e| e.to_string())
    } else {
        builder.try_init().map_err(|e| e.to_string())
    }
}
