//! Cleaning: sentinel-row removal, type coercion, deduplication, range
//! bounds, and the column renames/drops that fix up the source schema.
//!
//! The step order matters. Sentinel detection has to see the raw cells
//! because coercing to bool would turn a `9` into an ordinary `true`, and the
//! range filter compares coerced integers.

use polars::prelude::*;
use tracing::{debug, info, instrument};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::metrics::TransformMetrics;

/// Row predicate that flags the "unknown" marker in any non-exempt column.
///
/// Numeric cells match when they equal the marker exactly; text cells match
/// when any whitespace-separated token equals it.
#[derive(Debug, Clone)]
pub struct SentinelPredicate {
    token: String,
    numeric: Option<f64>,
    exempt: Vec<String>,
}

impl SentinelPredicate {
    pub fn new(token: impl Into<String>, exempt: Vec<String>) -> Self {
        let token = token.into();
        let numeric = token.trim().parse::<f64>().ok();
        Self {
            token,
            numeric,
            exempt,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.sentinel.clone(), config.exempt_columns.clone())
    }

    pub fn checks_column(&self, name: &str) -> bool {
        !self.exempt.iter().any(|c| c == name)
    }

    pub fn matches_number(&self, value: f64) -> bool {
        self.numeric == Some(value)
    }

    pub fn matches_text(&self, value: &str) -> bool {
        value.split_whitespace().any(|t| t == self.token)
    }

    pub fn matches_cell(&self, value: &AnyValue) -> bool {
        match value {
            AnyValue::String(s) => self.matches_text(s),
            AnyValue::StringOwned(s) => self.matches_text(s.as_str()),
            AnyValue::Null | AnyValue::Boolean(_) => false,
            other => other.extract::<f64>().is_some_and(|x| self.matches_number(x)),
        }
    }

    /// True when any checked cell of the row holds the marker.
    pub fn matches_row<'a, I>(&self, cells: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, AnyValue<'a>)>,
    {
        cells
            .into_iter()
            .any(|(name, value)| self.checks_column(name) && self.matches_cell(&value))
    }

    /// Per-row flags for one column. Bool and null cells never match.
    pub fn column_mask(&self, series: &Series) -> Result<BooleanChunked> {
        let dtype = series.dtype();
        let mask = if !self.checks_column(series.name().as_str()) {
            BooleanChunked::full("sentinel".into(), false, series.len())
        } else if matches!(dtype, DataType::String) {
            series
                .str()?
                .into_iter()
                .map(|v| Some(v.is_some_and(|t| self.matches_text(t))))
                .collect()
        } else if dtype.is_integer() || dtype.is_float() {
            series
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| Some(v.is_some_and(|x| self.matches_number(x))))
                .collect()
        } else {
            BooleanChunked::full("sentinel".into(), false, series.len())
        };
        Ok(mask)
    }
}

/// Row counts after each filtering step.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CleaningStats {
    pub rows_in: usize,
    pub after_sentinel: usize,
    pub after_dedup: usize,
    pub after_range: usize,
}

#[derive(Debug, Clone)]
pub struct CleanedFrame {
    pub df: DataFrame,
    pub stats: CleaningStats,
}

pub trait Cleaner {
    fn clean(&self, raw: &DataFrame) -> Result<CleanedFrame>;
}

pub struct DefaultCleaner {
    config: PipelineConfig,
}

impl Default for DefaultCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCleaner {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    fn check_required_columns(&self, raw: &DataFrame) -> Result<()> {
        let missing: Vec<String> = self
            .config
            .required_source_columns()
            .into_iter()
            .filter(|name| raw.get_column_index(name).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::schema(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )))
        }
    }
}

impl Cleaner for DefaultCleaner {
    #[instrument(skip_all, fields(rows = raw.height()))]
    fn clean(&self, raw: &DataFrame) -> Result<CleanedFrame> {
        self.check_required_columns(raw)?;
        let config = &self.config;
        let mut stats = CleaningStats {
            rows_in: raw.height(),
            ..Default::default()
        };

        info!("Number of rows before dropping sentinel rows: {}", raw.height());
        let df = drop_sentinel_rows(raw, &SentinelPredicate::from_config(config))?;
        stats.after_sentinel = df.height();
        info!("Number of rows after dropping sentinel rows: {}", df.height());
        TransformMetrics::record_sentinel_rows_dropped(stats.rows_in - stats.after_sentinel);

        let mut df = coerce_types(df, config)?;
        for name in &config.pre_dedup_drops {
            df = df.drop(name)?;
        }

        let df = deduplicate(&df)?;
        stats.after_dedup = df.height();
        debug!("{} duplicate rows removed", stats.after_sentinel - stats.after_dedup);
        TransformMetrics::record_duplicate_rows_dropped(stats.after_sentinel - stats.after_dedup);

        let mut df = filter_ranges(&df, config)?;
        stats.after_range = df.height();
        debug!("{} rows outside price/area bounds removed", stats.after_dedup - stats.after_range);
        TransformMetrics::record_out_of_range_rows_dropped(stats.after_dedup - stats.after_range);

        for rule in &config.renames {
            df.rename(&rule.from, rule.to.as_str().into())?;
        }
        for name in &config.post_rename_drops {
            df = df.drop(name)?;
        }

        Ok(CleanedFrame { df, stats })
    }
}

/// Drop every row the predicate flags.
pub fn drop_sentinel_rows(df: &DataFrame, predicate: &SentinelPredicate) -> Result<DataFrame> {
    let mut keep = BooleanChunked::full("keep".into(), true, df.height());
    for column in df.get_columns() {
        let flagged = predicate.column_mask(column.as_materialized_series())?;
        keep = &keep & &(!&flagged);
    }
    Ok(df.filter(&keep)?)
}

/// Integer columns become `Int64`, exempt columns are left alone, and every
/// other column becomes a `Boolean` flag.
pub fn coerce_types(mut df: DataFrame, config: &PipelineConfig) -> Result<DataFrame> {
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    for name in &names {
        let coerced = if config.integer_columns.contains(name) {
            coerce_int(df.column(name)?.as_materialized_series())?
        } else if config.is_exempt(name) {
            continue;
        } else {
            coerce_bool(df.column(name)?.as_materialized_series())?
        };
        df.with_column(coerced)?;
    }
    Ok(df)
}

/// Truthiness of a flag column. Missing cells count as set and so does any
/// non-empty text; numbers are set when non-zero.
pub fn coerce_bool(series: &Series) -> Result<Series> {
    let flags: BooleanChunked = if matches!(series.dtype(), DataType::String) {
        series
            .str()?
            .into_iter()
            .map(|v| Some(v.map_or(true, |t| !t.is_empty())))
            .collect()
    } else {
        series
            .cast(&DataType::Boolean)?
            .bool()?
            .into_iter()
            .map(|v| Some(v.unwrap_or(true)))
            .collect()
    };
    Ok(flags.with_name(series.name().clone()).into_series())
}

/// Cast to `Int64`, truncating floats. The first cell that cannot be
/// represented fails with its column and row position.
pub fn coerce_int(series: &Series) -> Result<Series> {
    let cast = if matches!(series.dtype(), DataType::String) {
        series
            .str()?
            .into_iter()
            .map(|v| v.and_then(|t| t.trim().parse::<i64>().ok()))
            .collect::<Int64Chunked>()
            .with_name(series.name().clone())
            .into_series()
    } else {
        series.cast(&DataType::Int64)?
    };

    if let Some(row) = cast.is_null().into_iter().position(|v| v == Some(true)) {
        return Err(PipelineError::TypeCoercion {
            column: series.name().to_string(),
            row,
            value: series.get(row).map(|v| v.to_string()).unwrap_or_default(),
            target: "integer",
        });
    }
    Ok(cast)
}

/// Keep the first occurrence of each distinct row, in order.
pub fn deduplicate(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.unique_stable(None, UniqueKeepStrategy::First, None)?)
}

/// Keep rows with `0 <= price <= price_max` and `0 <= area <= area_max`.
pub fn filter_ranges(df: &DataFrame, config: &PipelineConfig) -> Result<DataFrame> {
    let price = df.column(&config.price_column)?.as_materialized_series().i64()?;
    let area = df.column(&config.area_column)?.as_materialized_series().i64()?;
    let mask = price.gt_eq(0i64)
        & price.lt_eq(config.price_max)
        & area.gt_eq(0i64)
        & area.lt_eq(config.area_max);
    Ok(df.filter(&mask)?)
}
