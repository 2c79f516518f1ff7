//! Distribution reports for the cleaned listings.

pub mod distribution;

pub use distribution::{BoxStats, DistributionReport, Histogram, Scale};

use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;

/// Price in millions and Area in raw units.
pub fn build_reports(df: &DataFrame, config: &PipelineConfig) -> Result<Vec<DistributionReport>> {
    Ok(vec![
        DistributionReport::build(df, &config.price_column, Scale::Millions)?,
        DistributionReport::build(df, &config.area_column, Scale::Raw)?,
    ])
}

/// `<dir>/<column>_distribution.json`
pub fn report_path(dir: &Path, column: &str) -> PathBuf {
    let stem: String = column
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    dir.join(format!("{}_distribution.json", stem))
}

pub fn write_report(report: &DistributionReport, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = report_path(dir, &report.column);
    let body = serde_json::to_string_pretty(&report.to_chart_spec())?;
    std::fs::write(&path, body)?;
    info!("Wrote {} chart to {}", report.column, path.display());
    Ok(path)
}
