//! Sink Phase Metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct SinkMetrics;

impl SinkMetrics {
    pub fn record_table_written(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "sink", "tables_written")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "sink", "rows_written")).increment(rows as u64);
    }

    pub fn record_error() {
        ::metrics::counter!(phase_metric!(counter, "sink", "errors")).increment(1);
    }
}

impl PhaseMetrics for SinkMetrics {
    fn register_metrics() {
        use metrics::counter;

        let _ = counter!(phase_metric!(counter, "sink", "tables_written"));
        let _ = counter!(phase_metric!(counter, "sink", "rows_written"));
        let _ = counter!(phase_metric!(counter, "sink", "errors"));
    }

    fn phase_name() -> &'static str {
        "sink"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "sink", "tables_written"),
                metric_type: MetricType::Counter,
                help: "Tables replaced in the sink",
            },
            MetricDoc {
                name: phase_metric!(counter, "sink", "rows_written"),
                metric_type: MetricType::Counter,
                help: "Rows written across all tables",
            },
            MetricDoc {
                name: phase_metric!(counter, "sink", "errors"),
                metric_type: MetricType::Counter,
                help: "Failed table writes",
            },
        ]
    }
}
