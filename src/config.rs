//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::align::{DriverOptions, OverlapPolicy, OverlapValidator};
use crate::error::{RideLapseError, Result};
use crate::photo::{self, MAX_TIME_SKEW_S};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telemetry: TelemetryConfig,
    pub photos: PhotosConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telemetry source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    pub fit_file: PathBuf,
}

/// Photo source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PhotosConfig {
    pub manifest: PathBuf,

    /// Seconds added to every capture time (may be negative)
    #[serde(default)]
    pub time_skew_s: i64,
}

/// Output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
}

/// Alignment configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AlignmentConfig {
    #[serde(default = "default_window_len")]
    pub window_len: usize,

    #[serde(default)]
    pub overlap: OverlapPolicy,

    /// Fail pre-flight when a photo is further than this from its nearest sample
    #[serde(default)]
    pub max_gap_s: Option<i64>,

    #[serde(default = "default_clamp_past_end")]
    pub clamp_past_end: bool,
}

/// Map snapshot configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    #[serde(default = "default_map_delay_s")]
    pub delay_s: u64,

    #[serde(default = "default_map_size_px")]
    pub size_px: u32,

    #[serde(default = "default_map_zoom")]
    pub zoom: u8,

    #[serde(default = "default_marker_color")]
    pub marker_color: String,

    #[serde(default = "default_map_base_url")]
    pub base_url: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Also write logs to `ride-lapse.log` in this directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            window_len: default_window_len(),
            overlap: OverlapPolicy::default(),
            max_gap_s: None,
            clamp_past_end: default_clamp_past_end(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            delay_s: default_map_delay_s(),
            size_px: default_map_size_px(),
            zoom: default_map_zoom(),
            marker_color: default_marker_color(),
            base_url: default_map_base_url(),
        }
    }
}

// Default value functions
fn default_staging_dir() -> PathBuf { PathBuf::from("./staging") }

fn default_window_len() -> usize { 100 }
fn default_clamp_past_end() -> bool { true }

fn default_map_delay_s() -> u64 { 5 }
fn default_map_size_px() -> u32 { 200 }
fn default_map_zoom() -> u8 { 11 }
fn default_marker_color() -> String { "red".to_string() }
fn default_map_base_url() -> String { "https://maps.googleapis.com/maps/api/staticmap".to_string() }

fn invalid(message: impl std::fmt::Display) -> RideLapseError {
    RideLapseError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Relative paths in the file resolve against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ride_lapse::config::Config;
    ///
    /// let config = Config::load("ride-lapse.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() && !p.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.telemetry.fit_file);
        resolve(&mut self.photos.manifest);
        resolve(&mut self.output.staging_dir);
        if let Some(dir) = self.logging.log_dir.as_mut() {
            resolve(dir);
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.telemetry.fit_file.as_os_str().is_empty() {
            return Err(invalid("telemetry fit_file cannot be empty"));
        }

        if self.photos.manifest.as_os_str().is_empty() {
            return Err(invalid("photos manifest cannot be empty"));
        }

        if self.output.staging_dir.as_os_str().is_empty() {
            return Err(invalid("output staging_dir cannot be empty"));
        }

        if self.alignment.window_len == 0 || self.alignment.window_len > 10_000 {
            return Err(invalid("window_len must be between 1 and 10000"));
        }

        if self.photos.time_skew_s.unsigned_abs() > MAX_TIME_SKEW_S.unsigned_abs() {
            return Err(invalid(format!(
                "time_skew_s must be between -{0} and {0}",
                MAX_TIME_SKEW_S
            )));
        }

        if let Some(max_gap) = self.alignment.max_gap_s {
            if max_gap <= 0 || max_gap > MAX_TIME_SKEW_S {
                return Err(invalid(format!("max_gap_s must be between 1 and {}", MAX_TIME_SKEW_S)));
            }
        }

        if self.map.delay_s > 3600 {
            return Err(invalid("map delay_s must be at most 3600"));
        }

        if self.map.size_px == 0 || self.map.size_px > 640 {
            return Err(invalid("map size_px must be between 1 and 640"));
        }

        if self.map.zoom > 21 {
            return Err(invalid("map zoom must be between 0 and 21"));
        }

        if self.map.marker_color.is_empty() {
            return Err(invalid("map marker_color cannot be empty"));
        }

        if !self.map.base_url.starts_with("http://") && !self.map.base_url.starts_with("https://") {
            return Err(invalid("map base_url must be an http(s) URL"));
        }

        if let Some(dir) = &self.logging.log_dir {
            if dir.as_os_str().is_empty() {
                return Err(invalid("logging log_dir cannot be empty when set"));
            }
        }

        Ok(())
    }

    /// Camera clock correction applied to every photo
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimestamp` if `time_skew_s` is out of range.
    pub fn time_skew(&self) -> Result<Duration> {
        photo::time_skew(self.photos.time_skew_s)
    }

    /// Pre-flight validator for the configured coverage policy
    ///
    /// # Errors
    ///
    /// Returns `Config` if `max_gap_s` cannot be represented as a duration.
    pub fn overlap_validator(&self) -> Result<OverlapValidator> {
        let max_gap = match self.alignment.max_gap_s {
            Some(seconds) => Some(
                Duration::try_seconds(seconds)
                    .ok_or_else(|| invalid(format!("max_gap_s of {} is out of range", seconds)))?,
            ),
            None => None,
        };
        Ok(OverlapValidator::new(self.alignment.overlap, max_gap))
    }

    /// Driver options; `limit` comes from the command line, not the file
    pub fn driver_options(&self, limit: Option<usize>) -> DriverOptions {
        DriverOptions {
            window_len: NonZeroUsize::new(self.alignment.window_len).unwrap_or(NonZeroUsize::MIN),
            clamp_past_end: self.alignment.clamp_past_end,
            limit,
        }
    }
}
