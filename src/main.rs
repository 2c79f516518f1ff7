use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use estate_star::config::{AppConfig, SinkKind};
use estate_star::logging;
use estate_star::metrics;
use estate_star::pipeline::{open_sink, publish, CsvLoader, Pipeline, PipelineOutput, SourceLocation};
use estate_star::report;

#[derive(Parser)]
#[command(name = "estate-star")]
#[command(about = "Clean real-estate listings and publish them as a star schema")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, transform and publish the listings, then render the reports
    Run {
        /// CSV path or http(s) URL
        #[arg(long)]
        source: Option<String>,
        /// TOML config file (defaults to ./estate.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum)]
        sink: Option<SinkKind>,
        /// SQLite file or CSV output directory
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        report_dir: Option<PathBuf>,
        /// Rows of each published table to print
        #[arg(long)]
        preview: Option<usize>,
    },
    /// Load, clean and enrich only; nothing is written
    Inspect {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(config: Option<PathBuf>, source: Option<String>) -> Result<AppConfig> {
    let mut app = AppConfig::load(config.as_deref()).context("Failed to load configuration")?;
    if let Some(source) = source {
        app.source.location = source;
    }
    Ok(app)
}

fn transform(app: &AppConfig) -> Result<PipelineOutput> {
    let location = SourceLocation::parse(&app.source.location);
    info!("Loading listings from {}", location);

    let loaded = CsvLoader::new()
        .with_timeout(Duration::from_secs(app.source.timeout_seconds))
        .load(&location)
        .with_context(|| format!("Failed to load source {}", location))?;

    Pipeline::new(app.pipeline.clone())
        .run_source(&loaded, &location)
        .context("Pipeline run failed")
}

fn print_summary(output: &PipelineOutput) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&output.summary)?);
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging();
    metrics::init_metrics();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            config,
            sink,
            out,
            report_dir,
            preview,
        } => {
            let mut app = load_config(config, source)?;
            if let Some(kind) = sink {
                app.sink.kind = kind;
            }
            if let Some(out) = out {
                app.sink.path = out;
            }
            if let Some(dir) = report_dir {
                app.report.dir = dir;
            }
            if let Some(rows) = preview {
                app.report.preview_rows = rows;
            }

            let output = transform(&app)?;

            let sink = open_sink(&app.sink).context("Failed to open sink")?;
            publish(&output, sink.as_ref())
                .with_context(|| format!("Failed to publish to {}", sink.describe()))?;

            if output.enriched.height() == 0 {
                warn!("No rows left after cleaning, skipping distribution reports");
            } else {
                for dist in report::build_reports(&output.enriched, &app.pipeline)? {
                    println!("{}", dist.summary_text());
                    report::write_report(&dist, &app.report.dir)
                        .with_context(|| format!("Failed to write {} report", dist.column))?;
                }
            }

            for (name, _) in output.tables() {
                let head = sink
                    .read_head(name, app.report.preview_rows)
                    .with_context(|| format!("Failed to read back {}", name))?;
                println!("\n{}\n{}", name, head);
            }

            print_summary(&output)?;
            if let Some(snapshot) = metrics::render() {
                tracing::debug!("Metrics snapshot:\n{}", snapshot);
            }
        }
        Commands::Inspect { source, config } => {
            let app = load_config(config, source)?;
            let output = transform(&app)?;

            println!("{}", output.enriched.head(Some(app.report.preview_rows)));
            print_summary(&output)?;
        }
    }

    Ok(())
}
