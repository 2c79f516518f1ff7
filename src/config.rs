use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{PipelineError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "estate.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub report: ReportConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Local path or http(s) URL of the listings CSV
    pub location: String,
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            location: constants::DEFAULT_SOURCE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Sqlite,
    Csv,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    /// SQLite database file, or the output directory for the csv sink
    pub path: PathBuf,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Sqlite,
            path: PathBuf::from("output/estate.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub dir: PathBuf,
    pub preview_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output/reports"),
            preview_rows: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RenameRule {
    pub from: String,
    pub to: String,
}

/// One star-schema table: which enriched columns it projects and the name of
/// the 1-based identity column appended to it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TableSpec {
    /// Logical name the sink stores the table under
    pub table: String,
    pub id_column: String,
    pub columns: Vec<String>,
}

/// Everything the cleaning, enrichment and splitting stages treat as fixed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sentinel: String,
    /// Neither sentinel-checked nor coerced to bool (source names)
    pub exempt_columns: Vec<String>,
    /// Coerced to integers (source names)
    pub integer_columns: Vec<String>,
    /// Dropped right after coercion, before deduplication
    pub pre_dedup_drops: Vec<String>,
    pub renames: Vec<RenameRule>,
    /// Dropped after renaming (cleaned names)
    pub post_rename_drops: Vec<String>,
    pub price_column: String,
    pub area_column: String,
    pub price_max: i64,
    pub area_max: i64,
    /// One equal-width Area bin per label, lowest first
    pub area_labels: Vec<String>,
    pub fact: TableSpec,
    pub dimensions: Vec<TableSpec>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let dimension = |table: &str, id: &str, columns: &[&str]| TableSpec {
            table: table.to_string(),
            id_column: id.to_string(),
            columns: strings(columns),
        };
        Self {
            sentinel: constants::SENTINEL.to_string(),
            exempt_columns: strings(&[
                constants::PRICE,
                constants::AREA,
                constants::LOCATION,
                constants::BEDROOMS_RAW,
            ]),
            integer_columns: strings(&[constants::PRICE, constants::AREA, constants::BEDROOMS_RAW]),
            pre_dedup_drops: strings(&[constants::LIFT_AVAILABLE]),
            renames: constants::RENAMES
                .iter()
                .map(|(from, to)| RenameRule {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
            post_rename_drops: strings(&[constants::VAASTU_COMPLIANT]),
            price_column: constants::PRICE.to_string(),
            area_column: constants::AREA.to_string(),
            price_max: constants::PRICE_MAX,
            area_max: constants::AREA_MAX,
            area_labels: strings(&constants::AREA_LABELS),
            fact: dimension(constants::FACT_TABLE, constants::SALE_ID, constants::FACT_COLUMNS),
            dimensions: vec![
                dimension(
                    constants::HOUSEHOLD_TABLE,
                    constants::HOUSEHOLD_ID,
                    constants::HOUSEHOLD_COLUMNS,
                ),
                dimension(
                    constants::OUTDOOR_TABLE,
                    constants::OUTDOOR_ID,
                    constants::OUTDOOR_COLUMNS,
                ),
                dimension(
                    constants::COMMUNITY_TABLE,
                    constants::COMMUNITY_ID,
                    constants::COMMUNITY_COLUMNS,
                ),
                dimension(
                    constants::INDOOR_TABLE,
                    constants::INDOOR_ID,
                    constants::INDOOR_COLUMNS,
                ),
            ],
        }
    }
}

impl PipelineConfig {
    /// Map a cleaned column name back to the name it has in the source file.
    pub fn source_name<'a>(&'a self, cleaned: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|r| r.to == cleaned)
            .map(|r| r.from.as_str())
            .unwrap_or(cleaned)
    }

    /// Map a source column name to its cleaned name.
    pub fn cleaned_name<'a>(&'a self, source: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|r| r.from == source)
            .map(|r| r.to.as_str())
            .unwrap_or(source)
    }

    pub fn is_exempt(&self, source_column: &str) -> bool {
        self.exempt_columns.iter().any(|c| c == source_column)
    }

    /// Source columns the cleaner cannot run without.
    pub fn required_source_columns(&self) -> Vec<String> {
        let mut required: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !required.iter().any(|r| r == name) {
                required.push(name.to_string());
            }
        };
        for name in self
            .exempt_columns
            .iter()
            .chain(&self.integer_columns)
            .chain(&self.pre_dedup_drops)
        {
            push(name);
        }
        for rule in &self.renames {
            push(&rule.from);
        }
        for name in &self.post_rename_drops {
            push(self.source_name(name));
        }
        for spec in std::iter::once(&self.fact).chain(&self.dimensions) {
            for name in &spec.columns {
                push(self.source_name(name));
            }
        }
        required
    }

    pub fn validate(&self) -> Result<()> {
        if self.sentinel.trim().is_empty() {
            return Err(PipelineError::Config("sentinel must not be empty".to_string()));
        }
        if self.area_labels.is_empty() {
            return Err(PipelineError::Config(
                "area_labels needs at least one label".to_string(),
            ));
        }
        if self.price_max < 0 || self.area_max < 0 {
            return Err(PipelineError::Config(
                "price_max and area_max must be non-negative".to_string(),
            ));
        }
        for name in [&self.price_column, &self.area_column] {
            if !self.integer_columns.contains(name) {
                return Err(PipelineError::Config(format!(
                    "'{}' must be listed in integer_columns",
                    name
                )));
            }
        }
        let mut ids = vec![&self.fact.id_column];
        ids.extend(self.dimensions.iter().map(|d| &d.id_column));
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(PipelineError::Config(format!(
                    "identity column '{}' is used by more than one table",
                    id
                )));
            }
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from `estate.toml` when present.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env();
        config.pipeline.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(source) = std::env::var("ESTATE_SOURCE") {
            if !source.trim().is_empty() {
                self.source.location = source;
            }
        }
        if let Ok(db_path) = std::env::var("ESTATE_DB_PATH") {
            if !db_path.trim().is_empty() && self.sink.kind == SinkKind::Sqlite {
                self.sink.path = PathBuf::from(db_path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_columns_use_source_names() {
        let config = PipelineConfig::default();
        let required = config.required_source_columns();

        for name in [
            "Price",
            "Area",
            "Location",
            "No. of Bedrooms",
            "LiftAvailable",
            "VaastuCompliant",
            "Children'splayarea",
            "ClubHouse",
            "WashingMachine",
        ] {
            assert!(required.iter().any(|r| r == name), "missing {}", name);
        }
        assert!(!required.iter().any(|r| r == "NumOfBedrooms"));
        assert!(!required.iter().any(|r| r == "ChildrenPlayArea"));
    }

    #[test]
    fn test_every_rename_source_is_required() {
        let config = PipelineConfig::default();
        let required = config.required_source_columns();
        for rule in &config.renames {
            assert!(required.contains(&rule.from), "missing {}", rule.from);
        }
        assert!(required.iter().any(|r| r == "BED"));
        assert!(required.iter().any(|r| r == "Gasconnection"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [sink]
            kind = "csv"
            path = "out"

            [pipeline]
            price_max = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.sink.kind, SinkKind::Csv);
        assert_eq!(config.pipeline.price_max, 1000);
        assert_eq!(config.pipeline.area_max, constants::AREA_MAX);
        assert_eq!(config.pipeline.dimensions.len(), 4);
        assert_eq!(config.report.preview_rows, 10);
    }

    #[test]
    fn test_validate_rejects_shared_identity_columns() {
        let mut config = PipelineConfig::default();
        config.dimensions[1].id_column = config.dimensions[0].id_column.clone();
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_rename_lookups() {
        let config = PipelineConfig::default();
        assert_eq!(config.source_name("NumOfBedrooms"), "No. of Bedrooms");
        assert_eq!(config.cleaned_name("BED"), "Bed");
        assert_eq!(config.cleaned_name("School"), "School");
    }
}
