//! # Photo Module
//!
//! Timelapse photos as time keys for alignment.
//!
//! This module handles:
//! - Reading (path, capture time) pairs from a photo source
//! - Parsing EXIF-style capture timestamps
//! - Applying the camera clock skew uniformly
//! - Ordering photos by corrected capture time

pub mod manifest;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use tracing::info;

use crate::error::{RideLapseError, Result};

pub use manifest::PhotoManifest;

/// EXIF `DateTimeOriginal` layout
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Largest accepted camera clock correction, in either direction (10 years)
pub const MAX_TIME_SKEW_S: i64 = 10 * 365 * 24 * 60 * 60;

/// A photo as delivered by a photo source, before skew correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPhoto {
    pub path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

/// A photo keyed by its corrected capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    pub path: PathBuf,
    pub capture_time: DateTime<Utc>,
}

impl PhotoRecord {
    pub fn new<P: Into<PathBuf>>(path: P, capture_time: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            capture_time,
        }
    }

    /// File name with its extension, used to name derived artifacts.
    ///
    /// The extension is kept so `G001.JPG` and `G001.jpg` stay distinct.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo".to_string())
    }
}

/// Supplies the photos of one timelapse.
pub trait PhotoSource {
    fn photos(&self) -> Result<Vec<RawPhoto>>;
}

impl PhotoSource for Vec<RawPhoto> {
    fn photos(&self) -> Result<Vec<RawPhoto>> {
        Ok(self.clone())
    }
}

/// Parses a capture timestamp.
///
/// Accepts the EXIF layout (`2013:06:22 07:05:20`, taken as UTC) and RFC 3339.
///
/// # Errors
///
/// Returns `InvalidTimestamp` if neither layout matches.
pub fn parse_capture_time(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, EXIF_DATETIME_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RideLapseError::InvalidTimestamp(text.to_string()))
}

/// Converts a skew in seconds into a duration.
///
/// # Errors
///
/// Returns `InvalidTimestamp` if `seconds` is beyond [`MAX_TIME_SKEW_S`].
pub fn time_skew(seconds: i64) -> Result<Duration> {
    if seconds.unsigned_abs() > MAX_TIME_SKEW_S.unsigned_abs() {
        return Err(RideLapseError::InvalidTimestamp(format!(
            "time skew of {} seconds exceeds {} seconds",
            seconds, MAX_TIME_SKEW_S
        )));
    }
    Duration::try_seconds(seconds).ok_or_else(|| {
        RideLapseError::InvalidTimestamp(format!("time skew of {} seconds", seconds))
    })
}

/// Loads photos, shifts every capture time by `skew`, and sorts them ascending.
///
/// # Errors
///
/// Propagates photo source errors. Returns `InvalidTimestamp` if a shifted
/// capture time falls outside the representable range.
pub fn load_photos<S: PhotoSource + ?Sized>(
    source: &S,
    skew: Duration,
) -> Result<Vec<PhotoRecord>> {
    let raw = source.photos()?;
    info!("Loading and sorting capture times for {} photos...", raw.len());

    let mut photos = raw
        .into_iter()
        .map(|photo| {
            let capture_time = photo.captured_at.checked_add_signed(skew).ok_or_else(|| {
                RideLapseError::InvalidTimestamp(format!(
                    "{} shifted by {} seconds",
                    photo.path.display(),
                    skew.num_seconds()
                ))
            })?;
            Ok(PhotoRecord::new(photo.path, capture_time))
        })
        .collect::<Result<Vec<_>>>()?;
    photos.sort_by_key(|p| p.capture_time);
    Ok(photos)
}

/// Resolves `path` against `base` unless it is already absolute.
pub(crate) fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
