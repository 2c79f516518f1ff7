pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod report;

pub use config::{AppConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineOutput, RunSummary, TableSink};
