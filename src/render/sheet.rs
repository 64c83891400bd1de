//! # Frame Context Sheets
//!
//! Writes one JSON document per photo with everything a compositor needs to
//! lay out the final frame: status bar text, map reference, graph labels and
//! the four graph series (speed, heart rate, cadence, elevation).
//!
//! The sheet is written to a temporary name and renamed into place, so a
//! half-written file never counts as a finished photo on resume.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::staging::StagingDir;
use crate::align::{Compositor, FrameContext};
use crate::error::{RideLapseError, Result};
use crate::telemetry::AlignmentWindow;

/// Speed above which the speed label is emphasized (mph)
pub const SPEED_EMPHASIS_MPH: f64 = 25.0;

/// Heart rate above which the heart rate label turns into an alert (bpm)
pub const HEART_RATE_ALERT_BPM: f64 = 165.0;

/// Graph label text and emphasis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLabels {
    pub speed: String,
    pub speed_bold: bool,
    pub heart_rate: String,
    pub heart_rate_alert: bool,
    pub cadence: String,
    pub elevation: String,
}

impl GraphLabels {
    pub fn for_reading(speed: f64, heart_rate: f64) -> Self {
        let heart_rate_alert = heart_rate > HEART_RATE_ALERT_BPM;
        Self {
            speed: format!("{:>8}", format!("{:.1} MPH", speed)),
            speed_bold: speed > SPEED_EMPHASIS_MPH,
            heart_rate: if heart_rate_alert {
                format!("{:>7}", format!("{} BPM", heart_rate.trunc() as i64))
            } else {
                "Heart Rate (BPM)".to_string()
            },
            heart_rate_alert,
            cadence: "Cadence (RPM)".to_string(),
            elevation: "Elevation (Feet)".to_string(),
        }
    }
}

/// Graph data over a window, oldest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSeries {
    /// Number of x-axis slots (the configured window length)
    pub span: usize,
    pub speed: Vec<f64>,
    pub heart_rate: Vec<f64>,
    pub cadence: Vec<f64>,
    pub altitude: Vec<f64>,
}

impl GraphSeries {
    pub fn from_window(window: &AlignmentWindow<'_>, span: usize) -> Self {
        Self {
            span,
            speed: window.iter().map(|s| s.speed).collect(),
            heart_rate: window.iter().map(|s| s.heart_rate).collect(),
            cadence: window.iter().map(|s| s.cadence).collect(),
            altitude: window.iter().map(|s| s.altitude).collect(),
        }
    }
}

/// Serialized form of a frame
#[derive(Debug, Serialize)]
pub struct ContextSheet<'a> {
    pub photo: &'a std::path::Path,
    pub captured_at: DateTime<Utc>,
    pub anchor_time: DateTime<Utc>,
    pub status: &'a str,
    pub map: Option<&'a str>,
    pub elapsed_s: i64,
    pub remaining_miles: f64,
    pub labels: GraphLabels,
    pub graphs: GraphSeries,
}

impl<'a> ContextSheet<'a> {
    pub fn from_frame(frame: &'a FrameContext<'_>, span: usize) -> Self {
        let anchor = frame.anchor();
        Self {
            photo: &frame.photo.path,
            captured_at: frame.photo.capture_time,
            anchor_time: anchor.timestamp,
            status: &frame.status,
            map: frame.map.as_ref().map(|m| m.as_str()),
            elapsed_s: frame.elapsed.num_seconds(),
            remaining_miles: frame.remaining_distance,
            labels: GraphLabels::for_reading(anchor.speed, anchor.heart_rate),
            graphs: GraphSeries::from_window(&frame.window, span),
        }
    }
}

/// Compositor writing `merged-<file name>.json` sheets into the staging directory
#[derive(Debug, Clone)]
pub struct ContextSheetWriter {
    staging: StagingDir,
    span: usize,
}

impl ContextSheetWriter {
    pub fn new(staging: StagingDir, span: usize) -> Self {
        Self { staging, span }
    }
}

impl Compositor for ContextSheetWriter {
    fn compose(&mut self, frame: &FrameContext<'_>) -> Result<PathBuf> {
        let output = self.staging.output_path(frame.photo);
        let partial = output.with_extension("json.partial");

        let sheet = ContextSheet::from_frame(frame, self.span);
        let json = serde_json::to_vec_pretty(&sheet)?;

        debug!("Writing frame context {}", output.display());
        fs::write(&partial, json)
            .and_then(|_| fs::rename(&partial, &output))
            .map_err(|e| {
                RideLapseError::Collaborator(format!("failed to write {}: {}", output.display(), e))
            })?;
        Ok(output)
    }
}
