//! # Observability
//!
//! Tracing initialisation and Prometheus metrics for the cockpit.
//!
//! ## Features
//!
//! - Tracing setup (JSON / pretty / compact)
//! - Prometheus exporter
//! - Drive loop metrics and run statistics
//!
//! ## Usage
//!
//! ```ignore
//! use observability::{init, metrics};
//!
//! observability::init()?;
//!
//! let sample = manager.tick(control).await?;
//! metrics::record_tick(&sample.control, sample.speed_kmh, started.elapsed());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{
    record_frame_presented, record_gear_change, record_horn, record_tick, record_tick_overrun,
    record_town_change, DriveMetricsAggregator, DriveSummary, RunningStats, StatsSummary,
};

/// Initialise tracing and the Prometheus exporter with defaults.
///
/// - Tracing: JSON, honours `RUST_LOG`
/// - Prometheus: listens on 0.0.0.0:9000
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Filter used when `RUST_LOG` is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON lines
    #[default]
    Json,
    /// Human readable, multi-line
    Pretty,
    /// Single-line
    Compact,
}

/// Directives appended to the default filter; the exporter's HTTP stack is noisy at debug
const QUIET_DEPENDENCIES: &str = "hyper=warn,h2=warn";

/// Histogram buckets (ms) around the 16.7 ms period of a 60 Hz loop
const TICK_BUCKETS_MS: &[f64] = &[1.0, 2.5, 5.0, 10.0, 16.7, 25.0, 33.3, 50.0, 100.0, 250.0];

/// Initialise with an explicit configuration
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},{QUIET_DEPENDENCIES}", config.default_log_level))
    });

    let (json, pretty, compact) = match config.log_format {
        LogFormat::Json => (
            Some(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_thread_names(true)
                    .with_file(true)
                    .with_line_number(true),
            ),
            None,
            None,
        ),
        LogFormat::Pretty => (None, Some(fmt::layer().pretty()), None),
        LogFormat::Compact => (None, None, Some(fmt::layer().compact().with_target(false))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .with(compact)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// Install only the Prometheus exporter.
///
/// For callers that set up tracing themselves.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("carla_cockpit_tick_".to_string()),
            TICK_BUCKETS_MS,
        )
        .context("Invalid tick histogram buckets")?
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, Some(9000));
        assert_eq!(config.default_log_level, "info");
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
