//! # Pipeline
//!
//! One end-to-end alignment run:
//!
//! 1. Load and sort the telemetry series
//! 2. Load photos, applying the camera clock skew
//! 3. Validate overlap (fails before any per-photo work)
//! 4. Drive per-photo alignment into the staging directory
//!
//! The run is synchronous and blocking; the binary moves it off the async
//! runtime so Ctrl+C stays responsive.

use chrono::Duration;
use tracing::info;

use crate::align::{AlignmentDriver, RunSummary};
use crate::config::Config;
use crate::error::Result;
use crate::photo::manifest::PhotoManifest;
use crate::photo::{self, load_photos, PhotoSource};
use crate::render::{ContextSheetWriter, StagingDir, StaticMapProvider};
use crate::telemetry::fit::FitFile;
use crate::telemetry::{TelemetrySeries, TelemetrySource};

/// Command-line adjustments layered over the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOverrides {
    /// Replaces `photos.time_skew_s`
    pub time_skew_s: Option<i64>,
    /// Stop after this many processed photos
    pub limit: Option<usize>,
}

/// Runs alignment with the FIT file and photo manifest named in `config`.
pub fn run(config: &Config, overrides: RunOverrides) -> Result<RunSummary> {
    let telemetry = FitFile::new(&config.telemetry.fit_file);
    let photos = PhotoManifest::new(&config.photos.manifest);
    run_with_sources(config, overrides, &telemetry, &photos)
}

/// Runs alignment with explicit sources; output and map settings still come
/// from `config`.
///
/// # Errors
///
/// Any source, validation, staging or collaborator error. Validation errors
/// are raised before the staging directory is touched.
pub fn run_with_sources<T, P>(
    config: &Config,
    overrides: RunOverrides,
    telemetry: &T,
    photos: &P,
) -> Result<RunSummary>
where
    T: TelemetrySource + ?Sized,
    P: PhotoSource + ?Sized,
{
    let series = TelemetrySeries::from_source(telemetry)?;

    let skew = match overrides.time_skew_s {
        Some(seconds) => photo::time_skew(seconds)?,
        None => config.time_skew()?,
    };
    if skew != Duration::zero() {
        info!("Applying time skew of {} seconds", skew.num_seconds());
    }
    let photos = load_photos(photos, skew)?;

    config.overlap_validator()?.validate(&photos, &series)?;

    let staging = StagingDir::create(&config.output.staging_dir)?;
    let maps = StaticMapProvider::new(staging.clone(), &config.map);
    let sheets = ContextSheetWriter::new(staging.clone(), config.alignment.window_len);

    let options = config.driver_options(overrides.limit);
    let mut driver = AlignmentDriver::new(&series, options, staging, maps, sheets);
    driver.run(&photos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoggingConfig, MapConfig, OutputConfig, PhotosConfig, TelemetryConfig};
    use crate::error::RideLapseError;
    use crate::photo::RawPhoto;
    use crate::telemetry::{RawField, RawRecord};
    use chrono::{DateTime, TimeZone, Utc};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 6, 22, 7, 0, 0).unwrap()
    }

    fn records() -> Vec<RawRecord> {
        (0..10)
            .map(|i| RawRecord {
                timestamp: start() + Duration::seconds(i * 10),
                fields: vec![
                    RawField::new("position_lat", 567_000_000.0 + i as f64, "semicircles"),
                    RawField::new("position_long", -1_459_000_000.0, "semicircles"),
                    RawField::new("distance", i as f64 * 100.0, "m"),
                ],
            })
            .collect()
    }

    fn config(staging: PathBuf) -> Config {
        Config {
            telemetry: TelemetryConfig { fit_file: PathBuf::from("unused.fit") },
            photos: PhotosConfig { manifest: PathBuf::from("unused.jsonl"), time_skew_s: 0 },
            output: OutputConfig { staging_dir: staging },
            alignment: Default::default(),
            map: MapConfig { delay_s: 0, ..MapConfig::default() },
            logging: LoggingConfig::default(),
        }
    }

    fn photo(name: &str, offset_s: i64) -> RawPhoto {
        RawPhoto {
            path: PathBuf::from(name),
            captured_at: start() + Duration::seconds(offset_s),
        }
    }

    #[test]
    fn test_run_with_sources() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path().join("staging"));
        let photos = vec![photo("G002.JPG", 45), photo("G001.JPG", 12)];

        let summary =
            run_with_sources(&config, RunOverrides::default(), &records(), &photos).unwrap();
        assert_eq!(summary.processed, 2);
        assert!(temp.path().join("staging/merged-G001.JPG.json").exists());
        assert!(temp.path().join("staging/merged-G002.JPG.json").exists());
    }

    #[test]
    fn test_time_skew_override_moves_photos_out_of_range() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path().join("staging"));
        let photos = vec![photo("G001.JPG", 12)];
        let overrides = RunOverrides { time_skew_s: Some(-3600), limit: None };

        match run_with_sources(&config, overrides, &records(), &photos) {
            Err(RideLapseError::RangeMismatch(msg)) => {
                assert!(msg.contains("before first GPS point"));
            }
            other => panic!("Expected RangeMismatch, got: {:?}", other),
        }
        // Validation fails before staging is created
        assert!(!temp.path().join("staging").exists());
    }

    #[test]
    fn test_out_of_range_time_skew_override_is_error() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path().join("staging"));
        let photos = vec![photo("G001.JPG", 12)];
        let overrides = RunOverrides { time_skew_s: Some(9_000_000_000_000), limit: None };

        assert!(matches!(
            run_with_sources(&config, overrides, &records(), &photos),
            Err(RideLapseError::InvalidTimestamp(_))
        ));
        assert!(!temp.path().join("staging").exists());
    }

    #[test]
    fn test_limit_stops_early() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path().join("staging"));
        let photos = vec![photo("G001.JPG", 12), photo("G002.JPG", 45)];
        let overrides = RunOverrides { time_skew_s: None, limit: Some(1) };

        let summary = run_with_sources(&config, overrides, &records(), &photos).unwrap();
        assert_eq!(summary.processed, 1);
        assert!(temp.path().join("staging/merged-G001.JPG.json").exists());
        assert!(!temp.path().join("staging/merged-G002.JPG.json").exists());
    }

    #[test]
    fn test_empty_inputs() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path().join("staging"));

        let no_photos: Vec<RawPhoto> = Vec::new();
        assert!(matches!(
            run_with_sources(&config, RunOverrides::default(), &records(), &no_photos),
            Err(RideLapseError::NoImages)
        ));

        let no_records: Vec<RawRecord> = Vec::new();
        let one_photo = vec![photo("G001.JPG", 0)];
        assert!(matches!(
            run_with_sources(&config, RunOverrides::default(), &no_records, &one_photo),
            Err(RideLapseError::NoTelemetry)
        ));
    }
}
