//! # Telemetry Module
//!
//! Loads bike computer records and answers time-based lookups over them.
//!
//! This module handles:
//! - Reading raw records from a telemetry source (FIT files)
//! - Normalizing record fields into unit-converted samples
//! - Holding the samples in an immutable, time-ordered series
//! - Nearest-time and windowed lookups via binary search

pub mod fit;
pub mod sample;
pub mod series;

use chrono::{DateTime, Utc};

use crate::error::Result;

pub use fit::FitFile;
pub use sample::{Position, TelemetryField, TelemetrySample};
pub use series::{AlignmentWindow, NearestMatch, TelemetrySeries};

/// A single named value from a raw telemetry record, with its declared unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub name: String,
    pub value: f64,
    pub units: String,
}

impl RawField {
    pub fn new(name: impl Into<String>, value: f64, units: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            units: units.into(),
        }
    }
}

/// A timestamped record as delivered by a telemetry source, before unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub timestamp: DateTime<Utc>,
    pub fields: Vec<RawField>,
}

/// Supplies the finite sequence of raw records for one activity.
pub trait TelemetrySource {
    /// Read every record the source holds.
    fn records(&self) -> Result<Vec<RawRecord>>;
}

impl TelemetrySource for Vec<RawRecord> {
    fn records(&self) -> Result<Vec<RawRecord>> {
        Ok(self.clone())
    }
}
