//! # Ride Lapse
//!
//! Align timelapse photos with a bike computer's GPS track.
//!
//! This application matches every photo to the nearest telemetry sample and
//! writes a frame context (status bar, map reference, graph window) for each
//! one into the staging directory.

mod cli;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use ride_lapse::config::Config;
use ride_lapse::pipeline::{self, RunOverrides};

/// File name used when `logging.log_dir` is configured
const LOG_FILE_NAME: &str = "ride-lapse.log";

/// Exit status after Ctrl+C (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Main entry point for Ride Lapse
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Parse arguments and load the configuration file
///    - Set up logging (console, plus a log file if configured)
///
/// 2. **Alignment**
///    - Run the pipeline on a blocking worker thread
///    - Photos with existing output are skipped, so an interrupted run can
///      simply be restarted
///
/// 3. **Shutdown**
///    - On Ctrl+C, flush logs and exit with status 130
///
/// # Errors
///
/// Returns error if:
/// - The configuration file is missing or invalid
/// - Telemetry or photos cannot be loaded
/// - Photos and telemetry do not overlap
/// - Writing a map snapshot or frame context fails
///
/// # Examples
///
/// ```bash
/// ride-lapse --config ride-lapse.toml --time-skew -3600
/// ```
///
/// Expected output:
/// ```text
/// INFO ride_lapse: Ride Lapse v0.1.0 starting...
/// INFO ride_lapse::telemetry::series: Loaded 3600 telemetry samples from ...
/// INFO ride_lapse::align::driver: Processing /rides/photos/G0010042.JPG
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    let guard = init_logging(&cli, config.logging.log_dir.as_deref())?;

    info!("Ride Lapse v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Using config {}", cli.config.display());

    let overrides = RunOverrides {
        time_skew_s: cli.time_skew,
        limit: cli.limit(),
    };

    let task = tokio::task::spawn_blocking(move || pipeline::run(&config, overrides));

    tokio::select! {
        joined = task => {
            let summary = joined.context("Alignment task panicked")??;
            info!(
                "Done: {} processed, {} skipped, {} maps fetched",
                summary.processed, summary.skipped, summary.maps_fetched
            );
        }

        // The blocking task cannot be cancelled; outputs already written stay valid
        _ = tokio::signal::ctrl_c() => {
            warn!("Received Ctrl+C, shutting down...");
            drop(guard);
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    }

    Ok(())
}

/// Initialize logging
///
/// Console output is always on. When `log_dir` is set, the same events are
/// also appended to `ride-lapse.log` there; the returned guard must be kept
/// alive until exit so buffered lines get flushed.
fn init_logging(cli: &Cli, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(cli, rust_log.as_deref());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(LOG_FILE_NAME)
                .build(dir)
                .context("Failed to open log file")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}

/// Log filter: `-q` always wins, then a valid `RUST_LOG`, then `-v` count
fn log_filter(cli: &Cli, rust_log: Option<&str>) -> EnvFilter {
    if cli.quiet {
        return EnvFilter::new(cli.default_log_level());
    }
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(cli.default_log_level()))
}
