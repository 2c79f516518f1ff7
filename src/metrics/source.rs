//! Source Phase Metrics
//!
//! Fetching and parsing the listings CSV.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct SourceMetrics;

impl SourceMetrics {
    pub fn record_load(bytes: usize, rows: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "source", "loads")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "source", "payload_bytes"))
            .record(bytes as f64);
        ::metrics::gauge!(phase_metric!(gauge, "source", "rows")).set(rows as f64);
        ::metrics::histogram!(phase_metric!(histogram, "source", "duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_error() {
        ::metrics::counter!(phase_metric!(counter, "source", "errors")).increment(1);
    }
}

impl PhaseMetrics for SourceMetrics {
    fn register_metrics() {
        use metrics::{counter, gauge, histogram};

        let _ = counter!(phase_metric!(counter, "source", "loads"));
        let _ = counter!(phase_metric!(counter, "source", "errors"));
        let _ = gauge!(phase_metric!(gauge, "source", "rows"));
        let _ = histogram!(phase_metric!(histogram, "source", "payload_bytes"));
        let _ = histogram!(phase_metric!(histogram, "source", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "source"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "source", "loads"),
                metric_type: MetricType::Counter,
                help: "Source CSVs loaded",
            },
            MetricDoc {
                name: phase_metric!(counter, "source", "errors"),
                metric_type: MetricType::Counter,
                help: "Failed source loads",
            },
            MetricDoc {
                name: phase_metric!(gauge, "source", "rows"),
                metric_type: MetricType::Gauge,
                help: "Rows in the most recently loaded source",
            },
            MetricDoc {
                name: phase_metric!(histogram, "source", "payload_bytes"),
                metric_type: MetricType::Histogram,
                help: "Size of the raw CSV payload",
            },
            MetricDoc {
                name: phase_metric!(histogram, "source", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent fetching and parsing the source",
            },
        ]
    }
}
