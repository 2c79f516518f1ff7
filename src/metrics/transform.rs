//! Transform Phase Metrics
//!
//! Row counts dropped by each cleaning rule and the shape of the star schema.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct TransformMetrics;

impl TransformMetrics {
    pub fn record_sentinel_rows_dropped(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "transform", "sentinel_rows_dropped"))
            .increment(count as u64);
    }

    pub fn record_duplicate_rows_dropped(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "transform", "duplicate_rows_dropped"))
            .increment(count as u64);
    }

    pub fn record_out_of_range_rows_dropped(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "transform", "out_of_range_rows_dropped"))
            .increment(count as u64);
    }

    pub fn record_run(rows_in: usize, rows_out: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "transform", "runs")).increment(1);
        ::metrics::gauge!(phase_metric!(gauge, "transform", "rows_in")).set(rows_in as f64);
        ::metrics::gauge!(phase_metric!(gauge, "transform", "rows_out")).set(rows_out as f64);
        ::metrics::histogram!(phase_metric!(histogram, "transform", "duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_error(kind: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "transform", "errors"), "kind" => kind)
            .increment(1);
    }
}

impl PhaseMetrics for TransformMetrics {
    fn register_metrics() {
        use metrics::{counter, gauge, histogram};

        let _ = counter!(phase_metric!(counter, "transform", "sentinel_rows_dropped"));
        let _ = counter!(phase_metric!(counter, "transform", "duplicate_rows_dropped"));
        let _ = counter!(phase_metric!(counter, "transform", "out_of_range_rows_dropped"));
        let _ = counter!(phase_metric!(counter, "transform", "runs"));
        let _ = counter!(phase_metric!(counter, "transform", "errors"));
        let _ = gauge!(phase_metric!(gauge, "transform", "rows_in"));
        let _ = gauge!(phase_metric!(gauge, "transform", "rows_out"));
        let _ = histogram!(phase_metric!(histogram, "transform", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "transform"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "transform", "sentinel_rows_dropped"),
                metric_type: MetricType::Counter,
                help: "Rows dropped because a flag column held the unknown marker",
            },
            MetricDoc {
                name: phase_metric!(counter, "transform", "duplicate_rows_dropped"),
                metric_type: MetricType::Counter,
                help: "Rows dropped as exact duplicates",
            },
            MetricDoc {
                name: phase_metric!(counter, "transform", "out_of_range_rows_dropped"),
                metric_type: MetricType::Counter,
                help: "Rows dropped by the price/area bounds",
            },
            MetricDoc {
                name: phase_metric!(counter, "transform", "runs"),
                metric_type: MetricType::Counter,
                help: "Completed transformation runs",
            },
            MetricDoc {
                name: phase_metric!(counter, "transform", "errors"),
                metric_type: MetricType::Counter,
                help: "Failed transformation runs by error kind",
            },
            MetricDoc {
                name: phase_metric!(gauge, "transform", "rows_in"),
                metric_type: MetricType::Gauge,
                help: "Raw rows entering the last run",
            },
            MetricDoc {
                name: phase_metric!(gauge, "transform", "rows_out"),
                metric_type: MetricType::Gauge,
                help: "Rows in the last run's fact table",
            },
            MetricDoc {
                name: phase_metric!(histogram, "transform", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Clean + enrich + split duration",
            },
        ]
    }
}
