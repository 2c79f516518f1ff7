//! Sinks that persist the output tables under their logical names.

pub mod csv_dir;
pub mod in_memory;
pub mod sqlite;

pub use csv_dir::CsvDirSink;
pub use in_memory::InMemorySink;
pub use sqlite::SqliteSink;

use polars::prelude::DataFrame;

use crate::config::{SinkConfig, SinkKind};
use crate::error::Result;

/// Storage collaborator for the star schema.
pub trait TableSink {
    /// Store `df` under `name`, replacing whatever was there.
    fn replace_table(&self, name: &str, df: &DataFrame) -> Result<()>;

    /// Read back the first `limit` rows stored under `name`.
    fn read_head(&self, name: &str, limit: usize) -> Result<DataFrame>;

    /// Short description for log lines, e.g. `sqlite:output/estate.db`
    fn describe(&self) -> String;
}

/// Build the sink selected in configuration.
pub fn open_sink(config: &SinkConfig) -> Result<Box<dyn TableSink>> {
    Ok(match config.kind {
        SinkKind::Sqlite => Box::new(SqliteSink::open(&config.path)?),
        SinkKind::Csv => Box::new(CsvDirSink::create(&config.path)?),
        SinkKind::Memory => Box::new(InMemorySink::new()),
    })
}
