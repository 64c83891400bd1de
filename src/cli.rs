//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Ride Lapse - align timelapse photos with a bike computer's GPS track
#[derive(Parser, Debug)]
#[command(name = "ride-lapse", author, version, about)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ride-lapse.toml", env = "RIDE_LAPSE_CONFIG")]
    pub config: PathBuf,

    /// Seconds to add to every photo capture time (overrides the config file)
    #[arg(long, allow_negative_numbers = true)]
    pub time_skew: Option<i64>,

    /// Process a single photo and stop
    #[arg(long)]
    pub once: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Photo limit implied by `--once`
    pub fn limit(&self) -> Option<usize> {
        self.once.then_some(1)
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
