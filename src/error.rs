use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Schema error: {message}")]
    Schema { message: String },

    #[error("Cannot coerce {value} in column '{column}' (row {row}) to {target}")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
        target: &'static str,
    },

    #[error("Division by zero: column '{column}' is 0 at row {row}")]
    Division { column: String, row: usize },

    #[error("Table '{table}' has {actual} rows but the fact table has {expected}")]
    Cardinality {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Source fetch failed: {message}")]
    Source { message: String },

    #[error("Dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn missing_column(name: &str) -> Self {
        Self::schema(format!("missing required column '{}'", name))
    }

    /// Short label used for the error-kind metric.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "schema",
            Self::TypeCoercion { .. } => "type_coercion",
            Self::Division { .. } => "division",
            Self::Cardinality { .. } => "cardinality",
            Self::Http(_) | Self::Source { .. } => "source",
            Self::Polars(_) => "dataframe",
            Self::Sqlite(_) => "sqlite",
            Self::Json(_) => "json",
            Self::Toml(_) | Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
