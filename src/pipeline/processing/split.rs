//! Splits the enriched table into one fact table and its dimension tables.
//!
//! Foreign keys are positional: fact row `i` references row `i` of every
//! dimension. That only holds while all projections keep the enriched row
//! order, so every identity column is cut from one shared sequence and the
//! heights are checked before the keys are copied across.

use polars::prelude::*;
use tracing::{info, instrument};

use crate::config::{PipelineConfig, TableSpec};
use crate::error::{PipelineError, Result};
use crate::pipeline::processing::enrich::sequence;

#[derive(Debug, Clone)]
pub struct Dimension {
    /// Logical sink name, e.g. `householddimension`
    pub name: String,
    pub id_column: String,
    pub df: DataFrame,
}

#[derive(Debug, Clone)]
pub struct StarSchema {
    pub fact_name: String,
    pub fact: DataFrame,
    pub dimensions: Vec<Dimension>,
}

impl StarSchema {
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Fact table first, then dimensions, each with its logical name.
    pub fn tables(&self) -> Vec<(&str, &DataFrame)> {
        std::iter::once((self.fact_name.as_str(), &self.fact))
            .chain(self.dimensions.iter().map(|d| (d.name.as_str(), &d.df)))
            .collect()
    }
}

pub trait SchemaSplitter {
    fn split(&self, enriched: &DataFrame) -> Result<StarSchema>;
}

pub struct DefaultSchemaSplitter {
    config: PipelineConfig,
}

impl Default for DefaultSchemaSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultSchemaSplitter {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }
}

/// Project `spec.columns` and append the identity column.
fn project(enriched: &DataFrame, spec: &TableSpec, ids: &[i64]) -> Result<DataFrame> {
    if let Some(name) = spec
        .columns
        .iter()
        .find(|name| enriched.get_column_index(name).is_none())
    {
        return Err(PipelineError::missing_column(name));
    }
    let mut df = enriched.select(spec.columns.iter().map(String::as_str))?;
    df.with_column(Series::new(spec.id_column.as_str().into(), ids))?;
    Ok(df)
}

/// Every dimension must have exactly as many rows as the fact table.
pub fn check_cardinality(fact: &DataFrame, dimensions: &[Dimension]) -> Result<()> {
    for dimension in dimensions {
        if dimension.df.height() != fact.height() {
            return Err(PipelineError::Cardinality {
                table: dimension.name.clone(),
                expected: fact.height(),
                actual: dimension.df.height(),
            });
        }
    }
    Ok(())
}

impl SchemaSplitter for DefaultSchemaSplitter {
    #[instrument(skip_all, fields(rows = enriched.height()))]
    fn split(&self, enriched: &DataFrame) -> Result<StarSchema> {
        let ids = sequence(enriched.height());

        let mut fact = project(enriched, &self.config.fact, &ids)?;
        let dimensions = self
            .config
            .dimensions
            .iter()
            .map(|spec| {
                Ok(Dimension {
                    name: spec.table.clone(),
                    id_column: spec.id_column.clone(),
                    df: project(enriched, spec, &ids)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        check_cardinality(&fact, &dimensions)?;

        for dimension in &dimensions {
            let keys = dimension.df.column(&dimension.id_column)?.clone();
            fact.with_column(keys)?;
        }

        info!(
            "Split {} rows into fact table + {} dimensions",
            fact.height(),
            dimensions.len()
        );
        Ok(StarSchema {
            fact_name: self.config.fact.table.clone(),
            fact,
            dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            fact: TableSpec {
                table: "facts".to_string(),
                id_column: "SaleID".to_string(),
                columns: vec!["Price".to_string()],
            },
            dimensions: vec![
                TableSpec {
                    table: "kitchen".to_string(),
                    id_column: "KitchenID".to_string(),
                    columns: vec!["AC".to_string(), "TV".to_string()],
                },
                TableSpec {
                    table: "outdoor".to_string(),
                    id_column: "OutdoorID".to_string(),
                    columns: vec!["School".to_string()],
                },
            ],
            ..PipelineConfig::default()
        }
    }

    fn enriched() -> DataFrame {
        df!(
            "Price" => [10i64, 20, 30],
            "AC" => [true, false, true],
            "TV" => [false, false, true],
            "School" => [true, true, false],
        )
        .unwrap()
    }

    fn names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().iter().map(|n| n.to_string()).collect()
    }

    fn ints(df: &DataFrame, column: &str) -> Vec<Option<i64>> {
        df.column(column).unwrap().i64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_fact_columns_and_foreign_keys() {
        let schema = DefaultSchemaSplitter::with_config(small_config())
            .split(&enriched())
            .unwrap();

        assert_eq!(
            names(&schema.fact),
            vec!["Price", "SaleID", "KitchenID", "OutdoorID"]
        );
        let ids = vec![Some(1), Some(2), Some(3)];
        assert_eq!(ints(&schema.fact, "SaleID"), ids);
        assert_eq!(ints(&schema.fact, "KitchenID"), ids);
        assert_eq!(ints(&schema.dimension("outdoor").unwrap().df, "OutdoorID"), ids);
    }

    #[test]
    fn test_dimension_projection_is_verbatim() {
        let schema = DefaultSchemaSplitter::with_config(small_config())
            .split(&enriched())
            .unwrap();
        let kitchen = &schema.dimension("kitchen").unwrap().df;

        assert_eq!(names(kitchen), vec!["AC", "TV", "KitchenID"]);
        let projected = kitchen.select(["AC", "TV"]).unwrap();
        assert!(projected.equals(&enriched().select(["AC", "TV"]).unwrap()));
    }

    #[test]
    fn test_tables_lists_fact_first() {
        let schema = DefaultSchemaSplitter::with_config(small_config())
            .split(&enriched())
            .unwrap();
        let names: Vec<&str> = schema.tables().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["facts", "kitchen", "outdoor"]);
    }

    #[test]
    fn test_cardinality_mismatch_is_reported() {
        let fact = enriched();
        let short = Dimension {
            name: "kitchen".to_string(),
            id_column: "KitchenID".to_string(),
            df: enriched().head(Some(2)),
        };
        match check_cardinality(&fact, &[short]).unwrap_err() {
            PipelineError::Cardinality { table, expected, actual } => {
                assert_eq!(table, "kitchen");
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_dimension_column_is_schema_error() {
        let mut config = small_config();
        config.dimensions[0].columns.push("Microwave".to_string());
        let err = DefaultSchemaSplitter::with_config(config)
            .split(&enriched())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Schema { .. }));
    }
}
