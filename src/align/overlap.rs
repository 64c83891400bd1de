//! # Overlap Validation
//!
//! Fail-fast check that photos and telemetry share a usable time range. Runs
//! once, before any per-photo work.

use chrono::Duration;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{RideLapseError, Result};
use crate::photo::PhotoRecord;
use crate::telemetry::{NearestMatch, TelemetrySeries};

/// How much of the photo range must be covered by telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// The two ranges share at least one instant
    #[default]
    Intersect,
    /// Every photo lies within the telemetry range
    Contain,
}

/// Verifies that photos (sorted ascending) and telemetry overlap.
///
/// Only range intersection is checked: a photo may still be far from its
/// nearest sample.
///
/// # Errors
///
/// - `NoImages`: `photos` is empty
/// - `NoTelemetry`: `series` is empty
/// - `RangeMismatch`: the last photo precedes the first sample, or the
///   first photo follows the last sample
pub fn check_overlap(photos: &[PhotoRecord], series: &TelemetrySeries) -> Result<()> {
    let (Some(first_photo), Some(last_photo)) = (photos.first(), photos.last()) else {
        return Err(RideLapseError::NoImages);
    };
    let (Some(first_sample), Some(last_sample)) = (series.first(), series.last()) else {
        return Err(RideLapseError::NoTelemetry);
    };

    if last_photo.capture_time < first_sample.timestamp {
        return Err(RideLapseError::RangeMismatch(
            "last image occurs before first GPS point".to_string(),
        ));
    }
    if first_photo.capture_time > last_sample.timestamp {
        return Err(RideLapseError::RangeMismatch(
            "first image occurs after last GPS point".to_string(),
        ));
    }

    Ok(())
}

/// Pre-flight validator combining the overlap check with optional coverage rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapValidator {
    policy: OverlapPolicy,
    max_gap: Option<Duration>,
}

impl OverlapValidator {
    pub fn new(policy: OverlapPolicy, max_gap: Option<Duration>) -> Self {
        Self { policy, max_gap }
    }

    /// Runs [`check_overlap`], then the containment and max-gap rules if configured.
    ///
    /// # Errors
    ///
    /// - Any error from [`check_overlap`]
    /// - `RangeMismatch`: under [`OverlapPolicy::Contain`], a photo lies outside
    ///   the telemetry range
    /// - `TelemetryGap`: a photo's nearest sample is further than `max_gap`
    pub fn validate(&self, photos: &[PhotoRecord], series: &TelemetrySeries) -> Result<()> {
        check_overlap(photos, series)?;

        if self.policy == OverlapPolicy::Contain {
            self.check_contained(photos, series)?;
        }

        if let Some(max_gap) = self.max_gap {
            self.check_gaps(photos, series, max_gap)?;
        }

        if let (Some(first), Some(last)) = (photos.first(), photos.last()) {
            info!(
                "{} photos from {} to {} overlap telemetry",
                photos.len(),
                first.capture_time,
                last.capture_time
            );
        }
        Ok(())
    }

    fn check_contained(&self, photos: &[PhotoRecord], series: &TelemetrySeries) -> Result<()> {
        let Some((start, end)) = series.time_span() else {
            return Err(RideLapseError::NoTelemetry);
        };

        if let Some(photo) = photos.iter().find(|p| p.capture_time < start) {
            return Err(RideLapseError::RangeMismatch(format!(
                "{} occurs before first GPS point",
                photo.path.display()
            )));
        }
        if let Some(photo) = photos.iter().find(|p| p.capture_time > end) {
            return Err(RideLapseError::RangeMismatch(format!(
                "{} occurs after last GPS point",
                photo.path.display()
            )));
        }
        Ok(())
    }

    fn check_gaps(
        &self,
        photos: &[PhotoRecord],
        series: &TelemetrySeries,
        max_gap: Duration,
    ) -> Result<()> {
        for photo in photos {
            let sample = match series.nearest(photo.capture_time)? {
                NearestMatch::Found(index) => series.get(index),
                NearestMatch::PastEnd => series.last(),
            }
            .ok_or(RideLapseError::NoTelemetry)?;

            let offset = photo.capture_time - sample.timestamp;
            let gap = if offset < Duration::zero() { -offset } else { offset };
            debug!("{}: nearest sample {}s away", photo.path.display(), gap.num_seconds());
            if gap > max_gap {
                return Err(RideLapseError::TelemetryGap {
                    photo: photo.path.display().to_string(),
                    gap_s: gap.num_seconds(),
                    max_gap_s: max_gap.num_seconds(),
                });
            }
        }
        Ok(())
    }
}
