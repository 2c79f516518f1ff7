use polars::prelude::*;
use tracing::{debug, instrument};

use crate::config::PipelineConfig;
use crate::constants;
use crate::error::{PipelineError, Result};

/// Trait for adding derived columns to a cleaned frame
pub trait Enricher {
    fn enrich(&self, cleaned: &DataFrame) -> Result<DataFrame>;
}

/// Adds the surrogate key, the Area category and price per square foot.
pub struct DefaultEnricher {
    config: PipelineConfig,
}

impl Default for DefaultEnricher {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultEnricher {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Numeric view of a column, failing on the first non-numeric cell
    fn numeric_column(&self, df: &DataFrame, name: &str) -> Result<Float64Chunked> {
        let series = df
            .column(name)
            .map_err(|_| PipelineError::missing_column(name))?
            .as_materialized_series();
        let values = series.cast(&DataType::Float64)?;
        if let Some(row) = values.is_null().into_iter().position(|v| v == Some(true)) {
            return Err(PipelineError::TypeCoercion {
                column: name.to_string(),
                row,
                value: series.get(row).map(|v| v.to_string()).unwrap_or_default(),
                target: "number",
            });
        }
        Ok(values.f64()?.clone())
    }

    fn area_categories(&self, areas: &Float64Chunked) -> Result<Series> {
        let name = PlSmallStr::from_static(constants::AREA_CATEGORY);
        let labels = &self.config.area_labels;
        let Some(edges) = area_bin_edges(areas, labels.len()) else {
            return Ok(Series::new_empty(name, &DataType::String));
        };
        debug!("Area bin edges: {:?}", edges);

        // cut takes the interior breaks; the outer edges only bound the data
        let breaks = edges[1..labels.len()].to_vec();
        let labels = labels.iter().map(|l| PlSmallStr::from(l.as_str())).collect();
        let binned = cut(&areas.clone().into_series(), breaks, Some(labels), false, false)?;
        Ok(binned.cast(&DataType::String)?.with_name(name))
    }
}

impl Enricher for DefaultEnricher {
    #[instrument(skip_all, fields(rows = cleaned.height()))]
    fn enrich(&self, cleaned: &DataFrame) -> Result<DataFrame> {
        let config = &self.config;
        let areas = self.numeric_column(cleaned, &config.area_column)?;
        let prices = self.numeric_column(cleaned, &config.price_column)?;

        let keys = Series::new(constants::SURROGATE_KEY.into(), sequence(cleaned.height()));
        let categories = self.area_categories(&areas)?;

        if let Some(row) = areas.into_iter().position(|a| a == Some(0.0)) {
            return Err(PipelineError::Division {
                column: config.area_column.clone(),
                row,
            });
        }
        let ratios = (&prices / &areas)
            .with_name(constants::PRICE_PER_SQFT.into())
            .into_series();

        let mut df = cleaned.clone();
        df.with_column(keys)?;
        df.with_column(categories)?;
        df.with_column(ratios)?;
        Ok(df)
    }
}

/// 1-based dense identifiers, one per row.
pub fn sequence(len: usize) -> Vec<i64> {
    (1..=len as i64).collect()
}

/// Edges of `bins` equal-width, right-closed intervals spanning the observed
/// range. The lowest edge is pushed down by 0.1% of the range so the minimum
/// lands in the first bin; a zero-width range is widened on both sides.
/// Returns `None` for an empty input or zero bins.
pub fn area_bin_edges(values: &Float64Chunked, bins: usize) -> Option<Vec<f64>> {
    if bins == 0 {
        return None;
    }
    let min = values.min()?;
    let max = values.max()?;

    let (lo, hi) = if min == max {
        let adj = if min != 0.0 { min.abs() * 0.001 } else { 0.001 };
        (min - adj, max + adj)
    } else {
        (min, max)
    };

    let step = (hi - lo) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| lo + step * i as f64).collect();
    edges[bins] = hi;
    if min != max {
        edges[0] -= (max - min) * 0.001;
    }
    Some(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned(prices: &[i64], areas: &[i64]) -> DataFrame {
        df!(
            "Location" => prices.iter().map(|_| "Hebbal").collect::<Vec<_>>(),
            "Area" => areas,
            "Price" => prices,
        )
        .unwrap()
    }

    fn categories(df: &DataFrame) -> Vec<Option<String>> {
        df.column("Area Category")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_area_categories_follow_observed_range() {
        let df = cleaned(&[1, 1, 1, 1], &[500, 1000, 833, 1500]);
        let enriched = DefaultEnricher::new().enrich(&df).unwrap();

        assert_eq!(
            categories(&enriched),
            ["Small", "Medium", "Small", "Large"].map(|s| Some(s.to_string())).to_vec()
        );
    }

    #[test]
    fn test_bin_edges_match_equal_width_cut() {
        let areas = Float64Chunked::from_slice("Area".into(), &[500.0, 1000.0, 1500.0]);
        let edges = area_bin_edges(&areas, 3).unwrap();
        assert!((edges[0] - 499.0).abs() < 1e-9);
        assert!((edges[1] - 833.333_333).abs() < 1e-3);
        assert!((edges[2] - 1166.666_667).abs() < 1e-3);
        assert_eq!(edges[3], 1500.0);
    }

    #[test]
    fn test_constant_area_lands_in_middle_bin() {
        let df = cleaned(&[1, 2], &[1200, 1200]);
        let enriched = DefaultEnricher::new().enrich(&df).unwrap();
        assert_eq!(categories(&enriched), vec![Some("Medium".to_string()); 2]);
    }

    #[test]
    fn test_price_per_square_ft() {
        let df = cleaned(&[1_000_000], &[1000]);
        let enriched = DefaultEnricher::new().enrich(&df).unwrap();
        let ratio = enriched.column("Price per Square ft").unwrap().f64().unwrap().get(0);
        assert_eq!(ratio, Some(1000.0));
    }

    #[test]
    fn test_zero_area_is_division_error() {
        let df = cleaned(&[100, 200], &[10, 0]);
        match DefaultEnricher::new().enrich(&df).unwrap_err() {
            PipelineError::Division { column, row } => {
                assert_eq!(column, "Area");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_surrogate_keys_are_dense() {
        let df = cleaned(&[5, 6, 7, 8], &[10, 20, 30, 40]);
        let mask = BooleanChunked::from_slice("keep".into(), &[true, false, true, true]);
        let enriched = DefaultEnricher::new().enrich(&df.filter(&mask).unwrap()).unwrap();
        let keys: Vec<Option<i64>> = enriched.column("SurrogateKey").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(keys, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_empty_frame_gains_empty_columns() {
        let df = cleaned(&[], &[]);
        let enriched = DefaultEnricher::new().enrich(&df).unwrap();
        assert_eq!(enriched.height(), 0);
        assert!(enriched.get_column_index("Area Category").is_some());
        assert!(enriched.get_column_index("Price per Square ft").is_some());
    }
}
