// Data processing pipeline: ingestion, processing, and storage

pub mod ingestion;
pub mod orchestrator;
pub mod processing;
pub mod storage;

// Re-export key types from each stage
pub use ingestion::{CsvLoader, LoadedSource, SourceLocation};
pub use orchestrator::{publish, Pipeline, PipelineOutput, RunSummary};
pub use storage::{open_sink, TableSink};
