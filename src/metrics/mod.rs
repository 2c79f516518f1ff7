//! Metrics for the listings pipeline.
//!
//! Each phase (source loading, transformation, sink) owns a submodule with a
//! zero-sized struct of recording helpers. Names follow
//! `estate_{phase}_{metric}` so phases cannot collide.

pub mod registry;
pub mod sink;
pub mod source;
pub mod transform;

pub use sink::SinkMetrics;
pub use source::SourceMetrics;
pub use transform::TransformMetrics;

use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Initialize the global metrics recorder.
///
/// Idempotent. An HTTP exporter is only started when `ESTATE_METRICS_ADDR` is
/// set; otherwise the recorder is kept for in-process rendering.
pub fn init_metrics() {
    INIT.call_once(|| {
        let mut builder = metrics_exporter_prometheus::PrometheusBuilder::new();

        if let Ok(addr_str) = std::env::var("ESTATE_METRICS_ADDR") {
            match addr_str.parse::<std::net::SocketAddr>() {
                Ok(addr) => {
                    builder = builder.with_http_listener(addr);
                    info!("Prometheus HTTP exporter listening on http://{}/metrics", addr);
                }
                Err(_) => warn!("Invalid ESTATE_METRICS_ADDR '{}', exporter disabled", addr_str),
            }
        }

        match builder.install_recorder() {
            Ok(handle) => {
                let _ = HANDLE.set(handle);
                registry::register_all_metrics();
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
    });
}

/// Render the current metric snapshot in Prometheus text format.
pub fn render() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

/// Implemented by each phase's metrics collection.
pub trait PhaseMetrics {
    /// Register all metrics for this phase
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// estate_{phase}_{metric_name}[_total]
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("estate_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("estate_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("estate_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
