//! Distribution statistics behind the box-plot-over-histogram charts.
//!
//! Quantiles come from polars with linear interpolation between order
//! statistics. The histogram bin count follows the usual "auto" rule:
//! whichever of Sturges and Freedman-Diaconis gives the narrower bins. The
//! density curve is a Gaussian KDE with Scott's bandwidth, scaled to
//! histogram counts so both can share an axis.

use polars::prelude::*;
use serde::Serialize;
use serde_json::{json, Value as Json};
use std::f64::consts::PI;

use crate::error::{PipelineError, Result};

/// Points sampled along the KDE curve.
const KDE_POINTS: usize = 200;
/// Bandwidths the KDE grid extends past the data on each side.
const KDE_CUT: f64 = 3.0;
const WHISKER_IQR: f64 = 1.5;
/// Upper bound on histogram bins, however narrow the auto width gets.
pub const MAX_BINS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Raw,
    /// Ticks read `1.5M`
    Millions,
}

impl Scale {
    pub fn format_tick(&self, value: f64) -> String {
        match self {
            Scale::Raw => {
                if value.fract() == 0.0 {
                    format!("{:.0}", value)
                } else {
                    format!("{:.2}", value)
                }
            }
            Scale::Millions => format!("{:.1}M", value / 1_000_000.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// `None` when there are no values.
    pub fn from_values(values: &Float64Chunked) -> Result<Option<Self>> {
        let (Some(min), Some(max)) = (values.min(), values.max()) else {
            return Ok(None);
        };
        let quantile = |q: f64| -> Result<f64> {
            Ok(values.quantile(q, QuantileMethod::Linear)?.unwrap_or(f64::NAN))
        };
        let q1 = quantile(0.25)?;
        let q3 = quantile(0.75)?;
        let iqr = q3 - q1;
        let lo_fence = q1 - WHISKER_IQR * iqr;
        let hi_fence = q3 + WHISKER_IQR * iqr;

        let lower_whisker = values.filter(&values.gt_eq(lo_fence))?.min().unwrap_or(min);
        let upper_whisker = values.filter(&values.lt_eq(hi_fence))?.max().unwrap_or(max);
        let outliers = values
            .filter(&(values.lt(lower_whisker) | values.gt(upper_whisker)))?
            .sort(false)
            .into_no_null_iter()
            .collect();

        Ok(Some(Self {
            count: values.len(),
            mean: values.mean().unwrap_or(f64::NAN),
            std: values.std(1).filter(|s| s.is_finite()).unwrap_or(0.0),
            min,
            q1,
            median: quantile(0.5)?,
            q3,
            max,
            lower_whisker,
            upper_whisker,
            outliers,
        }))
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `counts.len() + 1` ascending edges
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        match (self.edges.first(), self.edges.get(1)) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        }
    }
}

/// Bin count from the narrower of the Sturges and Freedman-Diaconis widths,
/// capped at one bin per value and at [`MAX_BINS`].
pub fn auto_bin_count(stats: &BoxStats) -> usize {
    let n = stats.count;
    let range = stats.max - stats.min;
    if n == 0 || !(range > 0.0) {
        return 1;
    }
    let sturges = range / ((n as f64).log2() + 1.0);
    let fd = 2.0 * stats.iqr() / (n as f64).cbrt();
    let width = if fd > 0.0 { fd.min(sturges) } else { sturges };
    ((range / width).ceil() as usize).clamp(1, n.min(MAX_BINS))
}

pub fn histogram(sorted: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);
    let (lo, hi) = match (sorted.first(), sorted.last()) {
        (Some(lo), Some(hi)) if hi > lo => (*lo, *hi),
        (Some(v), Some(_)) => (v - 0.5, v + 0.5),
        _ => (0.0, 1.0),
    };
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

    let mut counts = vec![0usize; bins];
    for v in sorted {
        let bin = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[bin] += 1;
    }
    Histogram { edges, counts }
}

/// Scott's rule: `std * n^(-1/5)`.
pub fn scott_bandwidth(stats: &BoxStats) -> f64 {
    stats.std * (stats.count as f64).powf(-0.2)
}

/// Gaussian KDE sampled on `points` evenly spaced x positions.
///
/// Empty when the data has no spread.
pub fn gaussian_kde(sorted: &[f64], bw: f64, points: usize) -> Vec<(f64, f64)> {
    let (lo, hi) = match (sorted.first(), sorted.last()) {
        (Some(lo), Some(hi)) if bw > 0.0 && points > 1 => (lo - KDE_CUT * bw, hi + KDE_CUT * bw),
        _ => return Vec::new(),
    };
    let norm = sorted.len() as f64 * bw * (2.0 * PI).sqrt();
    let step = (hi - lo) / (points - 1) as f64;

    (0..points)
        .map(|i| {
            let x = lo + step * i as f64;
            let density = sorted
                .iter()
                .map(|v| (-0.5 * ((x - v) / bw).powi(2)).exp())
                .sum::<f64>()
                / norm;
            (x, density)
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    pub column: String,
    pub scale: Scale,
    pub stats: BoxStats,
    pub histogram: Histogram,
    /// KDE scaled to histogram counts
    pub kde: Vec<(f64, f64)>,
}

impl DistributionReport {
    pub fn build(df: &DataFrame, column: &str, scale: Scale) -> Result<Self> {
        let series = df
            .column(column)
            .map_err(|_| PipelineError::missing_column(column))?
            .as_materialized_series();
        let not_numeric = |row: usize| PipelineError::TypeCoercion {
            column: column.to_string(),
            row,
            value: series.get(row).map(|v| v.to_string()).unwrap_or_default(),
            target: "number",
        };
        let dtype = series.dtype();
        if !(dtype.is_integer() || dtype.is_float()) {
            return Err(not_numeric(0));
        }
        let cast = series.cast(&DataType::Float64)?;
        let values = cast.f64()?;
        if let Some(row) = values
            .into_iter()
            .position(|v| !v.is_some_and(f64::is_finite))
        {
            return Err(not_numeric(row));
        }

        let stats = BoxStats::from_values(values)?.ok_or_else(|| {
            PipelineError::schema(format!("column '{}' has no values to report", column))
        })?;
        let sorted: Vec<f64> = values.sort(false).into_no_null_iter().collect();
        let histogram = histogram(&sorted, auto_bin_count(&stats));
        let scale_to_counts = sorted.len() as f64 * histogram.bin_width();
        let kde = gaussian_kde(&sorted, scott_bandwidth(&stats), KDE_POINTS)
            .into_iter()
            .map(|(x, d)| (x, d * scale_to_counts))
            .collect();

        Ok(Self {
            column: column.to_string(),
            scale,
            stats,
            histogram,
            kde,
        })
    }

    pub fn title(&self) -> String {
        format!("{} Distribution and Outliers", self.column)
    }

    /// Two stacked panels sharing the x axis: a horizontal box plot over a
    /// histogram with its density curve.
    pub fn to_chart_spec(&self) -> Json {
        let ticks: Vec<Json> = self
            .histogram
            .edges
            .iter()
            .map(|e| json!({ "value": e, "label": self.scale.format_tick(*e) }))
            .collect();

        json!({
            "title": self.title(),
            "layout": {
                "rows": 2,
                "sharex": true,
                "height_ratios": [0.2, 0.8]
            },
            "x_axis": {
                "label": self.column,
                "scale": self.scale,
                "ticks": ticks
            },
            "panels": [
                {
                    "kind": "boxplot",
                    "orientation": "horizontal",
                    "q1": self.stats.q1,
                    "median": self.stats.median,
                    "q3": self.stats.q3,
                    "whiskers": [self.stats.lower_whisker, self.stats.upper_whisker],
                    "outliers": self.stats.outliers
                },
                {
                    "kind": "histogram",
                    "edges": self.histogram.edges,
                    "counts": self.histogram.counts,
                    "kde": self.kde.iter().map(|(x, y)| json!([x, y])).collect::<Vec<_>>()
                }
            ]
        })
    }

    pub fn summary_text(&self) -> String {
        let s = &self.stats;
        let fmt = |v: f64| self.scale.format_tick(v);
        format!(
            "{}: n={} mean={} min={} q1={} median={} q3={} max={} whiskers=[{}, {}] outliers={} bins={}",
            self.column,
            s.count,
            fmt(s.mean),
            fmt(s.min),
            fmt(s.q1),
            fmt(s.median),
            fmt(s.q3),
            fmt(s.max),
            fmt(s.lower_whisker),
            fmt(s.upper_whisker),
            s.outliers.len(),
            self.histogram.counts.len()
        )
    }
}
