use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::metrics::{SinkMetrics, TransformMetrics};
use crate::pipeline::ingestion::{LoadedSource, SourceLocation};
use crate::pipeline::processing::{
    Cleaner, CleaningStats, DefaultCleaner, DefaultEnricher, DefaultSchemaSplitter, Enricher,
    SchemaSplitter, StarSchema,
};
use crate::pipeline::storage::TableSink;

/// Provenance and row counts of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub source: Option<String>,
    pub checksum: Option<String>,
    pub cleaning: CleaningStats,
    pub rows_after_cleaning: usize,
    /// (logical name, height) in publish order
    pub tables: Vec<(String, usize)>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Cleaned and enriched listings, published as the original frame
    pub enriched: DataFrame,
    pub original_name: String,
    pub schema: StarSchema,
    pub summary: RunSummary,
}

impl PipelineOutput {
    /// Every output table with its logical name, original frame first.
    pub fn tables(&self) -> Vec<(&str, &DataFrame)> {
        std::iter::once((self.original_name.as_str(), &self.enriched))
            .chain(self.schema.tables())
            .collect()
    }
}

/// Cleaner → Enricher → Splitter.
pub struct Pipeline {
    cleaner: Box<dyn Cleaner>,
    enricher: Box<dyn Enricher>,
    splitter: Box<dyn SchemaSplitter>,
    original_name: String,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            cleaner: Box::new(DefaultCleaner::with_config(config.clone())),
            enricher: Box::new(DefaultEnricher::with_config(config.clone())),
            splitter: Box::new(DefaultSchemaSplitter::with_config(config)),
            original_name: crate::constants::ORIGINAL_TABLE.to_string(),
        }
    }

    /// Swap in custom stages.
    pub fn with_stages(
        cleaner: Box<dyn Cleaner>,
        enricher: Box<dyn Enricher>,
        splitter: Box<dyn SchemaSplitter>,
    ) -> Self {
        Self {
            cleaner,
            enricher,
            splitter,
            original_name: crate::constants::ORIGINAL_TABLE.to_string(),
        }
    }

    pub fn run(&self, raw: &DataFrame) -> Result<PipelineOutput> {
        self.execute(raw, None)
    }

    /// Like [`Pipeline::run`], recording where the table came from.
    pub fn run_source(&self, loaded: &LoadedSource, location: &SourceLocation) -> Result<PipelineOutput> {
        self.execute(&loaded.df, Some((location.to_string(), loaded.checksum.clone())))
    }

    #[instrument(skip_all, fields(rows = raw.height()))]
    fn execute(&self, raw: &DataFrame, provenance: Option<(String, String)>) -> Result<PipelineOutput> {
        let started_at = Utc::now();
        let start = Instant::now();

        let result = self.transform(raw);
        let (cleaned_stats, enriched, schema) = match result {
            Ok(parts) => parts,
            Err(e) => {
                TransformMetrics::record_error(e.kind());
                return Err(e);
            }
        };

        TransformMetrics::record_run(raw.height(), schema.fact.height(), start.elapsed().as_secs_f64());

        let (source, checksum) = match provenance {
            Some((source, checksum)) => (Some(source), Some(checksum)),
            None => (None, None),
        };
        let mut output = PipelineOutput {
            enriched,
            original_name: self.original_name.clone(),
            schema,
            summary: RunSummary {
                run_id: Uuid::new_v4(),
                started_at,
                source,
                checksum,
                rows_after_cleaning: cleaned_stats.after_range,
                cleaning: cleaned_stats,
                tables: Vec::new(),
            },
        };
        let tables = output
            .tables()
            .iter()
            .map(|(name, df)| (name.to_string(), df.height()))
            .collect();
        output.summary.tables = tables;

        info!(run_id = %output.summary.run_id, "Pipeline run complete");
        Ok(output)
    }

    fn transform(&self, raw: &DataFrame) -> Result<(CleaningStats, DataFrame, StarSchema)> {
        info!("Before cleaning: {} rows", raw.height());
        let cleaned = self.cleaner.clean(raw)?;
        info!("After cleaning: {} rows", cleaned.df.height());
        if cleaned.df.height() == 0 {
            warn!("No rows survived cleaning");
        }

        let enriched = self.enricher.enrich(&cleaned.df)?;
        let schema = self.splitter.split(&enriched)?;
        Ok((cleaned.stats, enriched, schema))
    }
}

/// Write every output table to `sink`, replacing existing ones.
#[instrument(skip_all, fields(sink = %sink.describe()))]
pub fn publish(output: &PipelineOutput, sink: &dyn TableSink) -> Result<()> {
    for (name, df) in output.tables() {
        if let Err(e) = sink.replace_table(name, df) {
            SinkMetrics::record_error();
            return Err(e);
        }
        SinkMetrics::record_table_written(df.height());
        info!("Published {} ({} rows)", name, df.height());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::pipeline::processing::CleanedFrame;
    use crate::pipeline::storage::InMemorySink;

    struct FailingCleaner;

    impl Cleaner for FailingCleaner {
        fn clean(&self, _raw: &DataFrame) -> Result<CleanedFrame> {
            Err(PipelineError::schema("boom"))
        }
    }

    struct PassThrough;

    impl Cleaner for PassThrough {
        fn clean(&self, raw: &DataFrame) -> Result<CleanedFrame> {
            Ok(CleanedFrame {
                df: raw.clone(),
                stats: CleaningStats {
                    rows_in: raw.height(),
                    after_sentinel: raw.height(),
                    after_dedup: raw.height(),
                    after_range: raw.height(),
                },
            })
        }
    }

    fn small_config() -> PipelineConfig {
        use crate::config::TableSpec;
        PipelineConfig {
            fact: TableSpec {
                table: "facts".to_string(),
                id_column: "SaleID".to_string(),
                columns: vec!["Price".to_string(), "Area".to_string()],
            },
            dimensions: vec![TableSpec {
                table: "kitchen".to_string(),
                id_column: "KitchenID".to_string(),
                columns: vec!["AC".to_string()],
            }],
            ..PipelineConfig::default()
        }
    }

    fn raw() -> DataFrame {
        polars::df!(
            "Price" => [2_000_000i64, 3_000_000],
            "Area" => [1000i64, 1500],
            "AC" => [true, false],
        )
        .unwrap()
    }

    fn pass_through_pipeline() -> Pipeline {
        let config = small_config();
        Pipeline::with_stages(
            Box::new(PassThrough),
            Box::new(DefaultEnricher::with_config(config.clone())),
            Box::new(DefaultSchemaSplitter::with_config(config)),
        )
    }

    #[test]
    fn test_summary_lists_every_table() {
        let output = pass_through_pipeline().run(&raw()).unwrap();

        assert_eq!(
            output.summary.tables,
            vec![
                ("originalframe".to_string(), 2),
                ("facts".to_string(), 2),
                ("kitchen".to_string(), 2),
            ]
        );
        assert_eq!(output.summary.rows_after_cleaning, 2);
        assert!(output.summary.checksum.is_none());
    }

    #[test]
    fn test_stage_error_propagates() {
        let config = small_config();
        let pipeline = Pipeline::with_stages(
            Box::new(FailingCleaner),
            Box::new(DefaultEnricher::with_config(config.clone())),
            Box::new(DefaultSchemaSplitter::with_config(config)),
        );
        assert!(matches!(pipeline.run(&raw()), Err(PipelineError::Schema { .. })));
    }

    #[test]
    fn test_publish_writes_all_tables() {
        let output = pass_through_pipeline().run(&raw()).unwrap();
        let sink = InMemorySink::new();
        publish(&output, &sink).unwrap();

        assert_eq!(sink.table_names(), vec!["facts", "kitchen", "originalframe"]);
        let facts = sink.get("facts").unwrap();
        let names: Vec<String> = facts.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["Price", "Area", "SaleID", "KitchenID"]);
    }
}
