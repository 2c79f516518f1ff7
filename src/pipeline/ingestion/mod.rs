//! Source loading: fetch the listings CSV from disk or over HTTP and read it
//! into a raw [`DataFrame`].
//!
//! Column types are inferred by the polars CSV reader over every row, so a
//! flag column of 0/1/9 comes back as integers and blank cells as nulls.

use polars::prelude::*;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use crate::error::{PipelineError, Result};
use crate::metrics::SourceMetrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Url(String),
    Path(PathBuf),
}

impl SourceLocation {
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceLocation::Url(trimmed.to_string())
        } else {
            SourceLocation::Path(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Url(url) => write!(f, "{}", url),
            SourceLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A parsed source plus provenance for the run summary.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub df: DataFrame,
    /// SHA-256 of the raw bytes, hex encoded
    pub checksum: String,
    pub bytes: usize,
}

/// CSV loader with an HTTP timeout for remote sources
pub struct CsvLoader {
    delimiter: u8,
    timeout: Duration,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self {
            delimiter: b',',
            timeout: Duration::from_secs(30),
        }
    }
}

impl CsvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch and parse the source.
    #[instrument(skip(self), fields(source = %location))]
    pub fn load(&self, location: &SourceLocation) -> Result<LoadedSource> {
        let started = Instant::now();
        let result = self
            .fetch_bytes(location)
            .and_then(|bytes| self.parse_bytes(&bytes).map(|df| (bytes, df)));

        match result {
            Ok((bytes, df)) => {
                let checksum = hex::encode(Sha256::digest(&bytes));
                info!(
                    "Loaded {} rows x {} columns ({} bytes, sha256 {})",
                    df.height(),
                    df.width(),
                    bytes.len(),
                    checksum
                );
                SourceMetrics::record_load(bytes.len(), df.height(), started.elapsed().as_secs_f64());
                Ok(LoadedSource {
                    df,
                    checksum,
                    bytes: bytes.len(),
                })
            }
            Err(e) => {
                SourceMetrics::record_error();
                Err(e)
            }
        }
    }

    pub fn fetch_bytes(&self, location: &SourceLocation) -> Result<Vec<u8>> {
        match location {
            SourceLocation::Path(path) => Ok(std::fs::read(path)?),
            SourceLocation::Url(url) => {
                let client = reqwest::blocking::Client::builder()
                    .timeout(self.timeout)
                    .build()?;
                debug!("GET {}", url);
                let response = client.get(url).send()?;
                let status = response.status();
                if !status.is_success() {
                    return Err(PipelineError::Source {
                        message: format!("GET {} returned HTTP {}", url, status.as_u16()),
                    });
                }
                Ok(response.bytes()?.to_vec())
            }
        }
    }

    /// Parse CSV bytes (header row required) into a raw frame.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<DataFrame> {
        let parse = CsvParseOptions::default().with_separator(self.delimiter);
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .with_parse_options(parse)
            .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
            .finish()
            .map_err(|e| PipelineError::schema(format!("malformed source CSV: {}", e)))
    }
}
