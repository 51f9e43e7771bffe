//! Logging and request metrics for Tollgate

pub mod metrics;

use tollgate_config::{LogFormat, TelemetryConfig};

pub use metrics::{MetricsSnapshot, RequestMetrics};

/// Initialize the global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over the configured filter. An invalid
/// filter falls back to `info` rather than failing startup.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true);

            registry.with(fmt_layer).try_init()
        }
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);

            registry.with(fmt_layer).try_init()
        }
    }
    .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}
