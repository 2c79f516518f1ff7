use polars::prelude::*;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use super::TableSink;
use crate::error::{PipelineError, Result};

/// In-memory sink for development/testing
pub struct InMemorySink {
    tables: Mutex<HashMap<String, DataFrame>>,
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySink {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Full copy of a stored table.
    pub fn get(&self, name: &str) -> Option<DataFrame> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.get(name).cloned()
    }

    pub fn table_names(&self) -> Vec<String> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        names
    }
}

impl TableSink for InMemorySink {
    fn replace_table(&self, name: &str, df: &DataFrame) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables.insert(name.to_string(), df.clone());

        debug!("Stored table {} ({} rows)", name, df.height());
        Ok(())
    }

    fn read_head(&self, name: &str, limit: usize) -> Result<DataFrame> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(name)
            .map(|df| df.head(Some(limit)))
            .ok_or_else(|| PipelineError::schema(format!("no table named '{}' in sink", name)))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_overwrites_previous_contents() {
        let sink = InMemorySink::new();
        let first = df!("a" => [1i64, 2, 3]).unwrap();
        let second = df!("b" => [9i64]).unwrap();

        sink.replace_table("t", &first).unwrap();
        sink.replace_table("t", &second).unwrap();

        assert!(sink.get("t").unwrap().equals(&second));
        assert_eq!(sink.table_names(), vec!["t".to_string()]);
    }

    #[test]
    fn test_read_head_limits_rows() {
        let sink = InMemorySink::new();
        sink.replace_table("t", &df!("a" => [1i64, 2, 3]).unwrap()).unwrap();

        let head = sink.read_head("t", 1).unwrap();
        assert_eq!(head.height(), 1);
        assert_eq!(head.column("a").unwrap().i64().unwrap().get(0), Some(1));
        assert!(sink.read_head("missing", 1).is_err());
    }
}
