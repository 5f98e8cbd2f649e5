//! Logging and metrics exporter setup

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use ragchat_common::config::ObservabilityConfig;
use ragchat_common::metrics::{register_metrics, METRICS_PREFIX, UPSTREAM_BUCKETS};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Install the Prometheus recorder and describe all metrics.
pub fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_upstream_duration_seconds", METRICS_PREFIX)),
            UPSTREAM_BUCKETS,
        )?
        .install_recorder()?;

    register_metrics();
    Ok(handle)
}
