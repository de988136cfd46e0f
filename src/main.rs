//! CLI entry point for the trip-data summarizer.
//!
//! `extract` downloads the next month of raw trip files for a year;
//! `transform` turns every pending month of a year into per-vendor summaries.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use tripdata_summarizer::catalog::pending_units;
use tripdata_summarizer::config::Settings;
use tripdata_summarizer::fetch::{BasicClient, DownloadOutcome, download_next_month};
use tripdata_summarizer::pipeline::run_batch;

#[derive(Parser)]
#[command(name = "tripdata_summarizer")]
#[command(about = "Summarizes monthly taxi trip records per vendor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the next missing month of raw trip files for a year
    Extract {
        /// The year of trip data to download (e.g. 2023)
        year: i32,

        /// Root directory for raw input files
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// Base URL the monthly files are served from
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Summarize every month of a year that has input but no output yet
    Transform {
        /// The year of trip data to process (e.g. 2023)
        year: i32,

        /// Root directory for raw input files
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// Root directory for summary CSVs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Maximum number of files processed at once
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/tripdata_summarizer.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("tripdata_summarizer.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;

    match cli.command {
        Commands::Extract {
            year,
            input_dir,
            base_url,
        } => {
            if let Some(dir) = input_dir {
                settings.input_root = dir;
            }
            if let Some(url) = base_url {
                settings.base_url = url;
            }
            extract(&settings, year).await?;
        }
        Commands::Transform {
            year,
            input_dir,
            output_dir,
            concurrency,
        } => {
            if let Some(dir) = input_dir {
                settings.input_root = dir;
            }
            if let Some(dir) = output_dir {
                settings.output_root = dir;
            }
            if let Some(n) = concurrency {
                settings.concurrency = n.max(1);
            }
            transform(&settings, year).await?;
        }
    }

    Ok(())
}

/// Fetches the earliest incomplete month of `year` into the input directory.
#[tracing::instrument(skip(settings), fields(input_root = %settings.input_root.display()))]
async fn extract(settings: &Settings, year: i32) -> Result<()> {
    let layout = settings.layout();
    let input_dir = layout.input_dir(year);
    std::fs::create_dir_all(&input_dir)
        .with_context(|| format!("failed to create '{}'", input_dir.display()))?;

    let client = Arc::new(BasicClient::new()?);
    let outcomes = download_next_month(client, &settings.base_url, &layout, year).await;

    let downloaded = outcomes
        .iter()
        .filter(|o| matches!(o, DownloadOutcome::Downloaded(_)))
        .count();
    info!(year, downloaded, "Extraction finished");
    Ok(())
}

/// Runs every pending unit of `year` through the pipeline.
///
/// Per-file failures are logged and do not fail the command.
#[tracing::instrument(
    skip(settings),
    fields(
        input_root = %settings.input_root.display(),
        output_root = %settings.output_root.display()
    )
)]
async fn transform(settings: &Settings, year: i32) -> Result<()> {
    let layout = settings.layout();
    let output_dir = layout.output_dir(year);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create '{}'", output_dir.display()))?;

    let units = pending_units(&layout, year);
    if units.is_empty() {
        info!(year, "No more data to be processed");
        return Ok(());
    }

    info!(
        year,
        units = units.len(),
        concurrency = settings.concurrency,
        "Starting batch"
    );
    let report = run_batch(units, layout, settings.concurrency).await;

    let completed = report.completed.len();
    let failed = report.failed.len();
    if report.is_success() {
        info!(year, completed, "Transform finished");
    } else {
        warn!(year, completed, failed, "Transform finished with failures");
    }

    Ok(())
}
