use polars::prelude::*;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::TableSink;
use crate::error::{PipelineError, Result};

/// Writes each table to its own SQLite table, dropping the old one first.
pub struct SqliteSink {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = stmt
            .query_map(params![], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_affinity(dtype: &DataType) -> &'static str {
    if matches!(dtype, DataType::Boolean) || dtype.is_integer() {
        "INTEGER"
    } else if dtype.is_float() {
        "REAL"
    } else {
        "TEXT"
    }
}

/// Bools are stored as 0/1; anything that is not a number goes in as text.
fn to_sql(series: &Series) -> Result<Vec<SqlValue>> {
    let dtype = series.dtype();
    let cells = if matches!(dtype, DataType::Boolean) {
        series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(SqlValue::Null, |b| SqlValue::Integer(i64::from(b))))
            .collect()
    } else if dtype.is_integer() {
        let ints = series.cast(&DataType::Int64)?;
        ints.i64()?
            .into_iter()
            .map(|v| v.map_or(SqlValue::Null, SqlValue::Integer))
            .collect()
    } else if dtype.is_float() {
        let floats = series.cast(&DataType::Float64)?;
        floats
            .f64()?
            .into_iter()
            .map(|v| v.map_or(SqlValue::Null, SqlValue::Real))
            .collect()
    } else {
        let text = series.cast(&DataType::String)?;
        text.str()?
            .into_iter()
            .map(|v| v.map_or(SqlValue::Null, |s| SqlValue::Text(s.to_string())))
            .collect()
    };
    Ok(cells)
}

/// Integer when every stored cell is, then float, otherwise text.
fn from_sql(name: &str, cells: &[SqlValue]) -> Series {
    let name = PlSmallStr::from(name);
    let numeric = |allow_real: bool| {
        cells.iter().all(|c| match c {
            SqlValue::Null | SqlValue::Integer(_) => true,
            SqlValue::Real(_) => allow_real,
            _ => false,
        })
    };
    if numeric(false) {
        let ints: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                SqlValue::Integer(i) => Some(*i),
                _ => None,
            })
            .collect();
        Series::new(name, ints)
    } else if numeric(true) {
        let floats: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                SqlValue::Integer(i) => Some(*i as f64),
                SqlValue::Real(f) => Some(*f),
                _ => None,
            })
            .collect();
        Series::new(name, floats)
    } else {
        let text: Vec<Option<String>> = cells
            .iter()
            .map(|c| match c {
                SqlValue::Null => None,
                SqlValue::Integer(i) => Some(i.to_string()),
                SqlValue::Real(f) => Some(f.to_string()),
                SqlValue::Text(s) => Some(s.clone()),
                SqlValue::Blob(bytes) => Some(hex::encode(bytes)),
            })
            .collect();
        Series::new(name, text)
    }
}

impl TableSink for SqliteSink {
    fn replace_table(&self, name: &str, df: &DataFrame) -> Result<()> {
        if df.width() == 0 {
            return Err(PipelineError::schema(format!(
                "cannot store table '{}' without columns",
                name
            )));
        }
        let columns_sql = df
            .get_columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name()), column_affinity(c.dtype())))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=df.width())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let cells = df
            .get_columns()
            .iter()
            .map(|c| to_sql(c.as_materialized_series()))
            .collect::<Result<Vec<_>>>()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)), params![])?;
        tx.execute(
            &format!("CREATE TABLE {} ({})", quote_ident(name), columns_sql),
            params![],
        )?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                quote_ident(name),
                placeholders
            ))?;
            for row in 0..df.height() {
                stmt.execute(params_from_iter(cells.iter().map(|column| &column[row])))?;
            }
        }
        tx.commit()?;

        debug!("Replaced sqlite table {} with {} rows", name, df.height());
        Ok(())
    }

    fn read_head(&self, name: &str, limit: usize) -> Result<DataFrame> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} LIMIT ?1", quote_ident(name)))?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
        let mut cells: Vec<Vec<SqlValue>> = vec![Vec::new(); names.len()];

        let mut rows = stmt.query(params![limit as i64])?;
        while let Some(row) = rows.next()? {
            for (i, column) in cells.iter_mut().enumerate() {
                column.push(row.get::<_, SqlValue>(i)?);
            }
        }

        let columns = names
            .iter()
            .zip(&cells)
            .map(|(name, cells)| from_sql(name, cells).into())
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite:{}", path.display()),
            None => "sqlite::memory:".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> DataFrame {
        df!(
            "Location" => ["Hebbal", "Kengeri"],
            "Price" => [4_500_000i64, 6_000_000],
            "AC" => [true, false],
            "Price per Square ft" => [4500.0, 5000.0],
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip_converts_bools_to_integers() {
        let sink = SqliteSink::open_in_memory().unwrap();
        sink.replace_table("salespricefactstable", &listing()).unwrap();

        let back = sink.read_head("salespricefactstable", 10).unwrap();
        let names: Vec<String> = back.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["Location", "Price", "AC", "Price per Square ft"]);

        let ac: Vec<Option<i64>> = back.column("AC").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(ac, vec![Some(1), Some(0)]);
        assert_eq!(back.column("Price per Square ft").unwrap().f64().unwrap().get(1), Some(5000.0));
        assert_eq!(back.column("Location").unwrap().str().unwrap().get(0), Some("Hebbal"));
    }

    #[test]
    fn test_nulls_survive_the_round_trip() {
        let sink = SqliteSink::open_in_memory().unwrap();
        let df = df!("Area" => [Some(1200i64), None]).unwrap();
        sink.replace_table("t", &df).unwrap();

        let back = sink.read_head("t", 10).unwrap();
        assert_eq!(back.column("Area").unwrap().null_count(), 1);
    }

    #[test]
    fn test_replace_drops_previous_table() {
        let sink = SqliteSink::open_in_memory().unwrap();
        sink.replace_table("t", &listing()).unwrap();
        sink.replace_table("t", &listing().head(Some(1))).unwrap();

        assert_eq!(sink.read_head("t", 10).unwrap().height(), 1);
        assert_eq!(sink.table_names().unwrap(), vec!["t".to_string()]);
    }

    #[test]
    fn test_quoted_identifiers_allow_spaces() {
        assert_eq!(quote_ident("Area Category"), "\"Area Category\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_missing_table_is_error() {
        let sink = SqliteSink::open_in_memory().unwrap();
        assert!(matches!(
            sink.read_head("nope", 1),
            Err(PipelineError::Sqlite(_))
        ));
    }
}
