//! # Telemetry Samples
//!
//! Normalized sensor readings and the field table used to build them.
//!
//! Raw records declare a unit for every field. Each field the table knows is
//! checked against its expected unit and converted once, at load time:
//!
//! | Field | Source unit | Sample unit |
//! |-------|-------------|-------------|
//! | position_lat / position_long | semicircles | degrees |
//! | speed / enhanced_speed | m/s | mph |
//! | heart_rate | bpm | bpm |
//! | cadence | rpm | rpm |
//! | altitude / enhanced_altitude | m | feet |
//! | grade | % | % |
//! | distance | m | miles |
//! | temperature | C | °F |
//!
//! Fields outside the table are ignored. A known field carrying a different
//! unit is an error rather than a silent zero.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::RawRecord;
use crate::error::{RideLapseError, Result};

/// Semicircles to degrees (180 / 2^31)
pub const SEMICIRCLE_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/// Meters per second to miles per hour
pub const MS_TO_MPH: f64 = 2.23694;

/// Meters to miles
pub const METERS_TO_MILES: f64 = 0.000621371;

/// Meters to feet
pub const METERS_TO_FEET: f64 = 3.28084;

/// Geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single normalized telemetry reading.
///
/// Fields missing from the source record are zero, except `position`, which
/// is only present when both coordinates were recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    pub timestamp: DateTime<Utc>,
    pub position: Option<Position>,
    /// Speed in mph
    pub speed: f64,
    /// Heart rate in bpm
    pub heart_rate: f64,
    /// Cadence in rpm
    pub cadence: f64,
    /// Altitude in feet
    pub altitude: f64,
    /// Grade in percent
    pub grade: f64,
    /// Cumulative distance in miles
    pub distance: f64,
    /// Temperature in °F
    pub temperature: f64,
}

/// Named sample fields available for generic access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryField {
    Latitude,
    Longitude,
    Speed,
    HeartRate,
    Cadence,
    Altitude,
    Grade,
    Distance,
    Temperature,
}

impl TelemetryField {
    pub const ALL: [TelemetryField; 9] = [
        TelemetryField::Latitude,
        TelemetryField::Longitude,
        TelemetryField::Speed,
        TelemetryField::HeartRate,
        TelemetryField::Cadence,
        TelemetryField::Altitude,
        TelemetryField::Grade,
        TelemetryField::Distance,
        TelemetryField::Temperature,
    ];

    /// Field name as used by telemetry sources.
    pub fn name(self) -> &'static str {
        match self {
            TelemetryField::Latitude => "position_lat",
            TelemetryField::Longitude => "position_long",
            TelemetryField::Speed => "speed",
            TelemetryField::HeartRate => "heart_rate",
            TelemetryField::Cadence => "cadence",
            TelemetryField::Altitude => "altitude",
            TelemetryField::Grade => "grade",
            TelemetryField::Distance => "distance",
            TelemetryField::Temperature => "temperature",
        }
    }

    /// Unit of the value stored in a [`TelemetrySample`].
    pub fn unit(self) -> &'static str {
        match self {
            TelemetryField::Latitude | TelemetryField::Longitude => "degrees",
            TelemetryField::Speed => "mph",
            TelemetryField::HeartRate => "bpm",
            TelemetryField::Cadence => "rpm",
            TelemetryField::Altitude => "feet",
            TelemetryField::Grade => "%",
            TelemetryField::Distance => "miles",
            TelemetryField::Temperature => "F",
        }
    }
}

impl fmt::Display for TelemetryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TelemetryField {
    type Err = RideLapseError;

    fn from_str(s: &str) -> Result<Self> {
        TelemetryField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| RideLapseError::UnknownField(s.to_string()))
    }
}

/// One row of the field table: a source field, its declared unit, and where
/// the converted value lands.
struct FieldConversion {
    source_name: &'static str,
    source_unit: &'static str,
    field: TelemetryField,
    convert: fn(f64) -> f64,
}

fn identity(value: f64) -> f64 {
    value
}

fn semicircles_to_degrees(value: f64) -> f64 {
    value * SEMICIRCLE_TO_DEGREES
}

fn ms_to_mph(value: f64) -> f64 {
    value * MS_TO_MPH
}

fn meters_to_feet(value: f64) -> f64 {
    value * METERS_TO_FEET
}

fn meters_to_miles(value: f64) -> f64 {
    value * METERS_TO_MILES
}

fn celsius_to_fahrenheit(value: f64) -> f64 {
    value * 9.0 / 5.0 + 32.0
}

const fn row(
    source_name: &'static str,
    source_unit: &'static str,
    field: TelemetryField,
    convert: fn(f64) -> f64,
) -> FieldConversion {
    FieldConversion { source_name, source_unit, field, convert }
}

const FIELD_TABLE: &[FieldConversion] = &[
    row("position_lat", "semicircles", TelemetryField::Latitude, semicircles_to_degrees),
    row("position_long", "semicircles", TelemetryField::Longitude, semicircles_to_degrees),
    row("speed", "m/s", TelemetryField::Speed, ms_to_mph),
    row("enhanced_speed", "m/s", TelemetryField::Speed, ms_to_mph),
    row("heart_rate", "bpm", TelemetryField::HeartRate, identity),
    row("cadence", "rpm", TelemetryField::Cadence, identity),
    row("altitude", "m", TelemetryField::Altitude, meters_to_feet),
    row("enhanced_altitude", "m", TelemetryField::Altitude, meters_to_feet),
    row("grade", "%", TelemetryField::Grade, identity),
    row("distance", "m", TelemetryField::Distance, meters_to_miles),
    row("temperature", "C", TelemetryField::Temperature, celsius_to_fahrenheit),
];

fn lookup_conversion(source_name: &str) -> Option<&'static FieldConversion> {
    FIELD_TABLE.iter().find(|c| c.source_name == source_name)
}

impl TelemetrySample {
    /// Creates a sample at `timestamp` with every reading zeroed.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            position: None,
            speed: 0.0,
            heart_rate: 0.0,
            cadence: 0.0,
            altitude: 0.0,
            grade: 0.0,
            distance: 0.0,
            temperature: 0.0,
        }
    }

    /// Converts a raw record through the field table.
    ///
    /// # Errors
    ///
    /// Returns `UnitMismatch` if a known field declares an unexpected unit.
    pub fn from_raw(record: &RawRecord) -> Result<Self> {
        let mut sample = Self::new(record.timestamp);
        let mut latitude = None;
        let mut longitude = None;

        for raw in &record.fields {
            let Some(conversion) = lookup_conversion(&raw.name) else {
                continue;
            };

            if raw.units != conversion.source_unit {
                return Err(RideLapseError::UnitMismatch {
                    field: raw.name.clone(),
                    expected: conversion.source_unit,
                    found: raw.units.clone(),
                });
            }

            let value = (conversion.convert)(raw.value);
            match conversion.field {
                TelemetryField::Latitude => latitude = Some(value),
                TelemetryField::Longitude => longitude = Some(value),
                TelemetryField::Speed => sample.speed = value,
                TelemetryField::HeartRate => sample.heart_rate = value,
                TelemetryField::Cadence => sample.cadence = value,
                TelemetryField::Altitude => sample.altitude = value,
                TelemetryField::Grade => sample.grade = value,
                TelemetryField::Distance => sample.distance = value,
                TelemetryField::Temperature => sample.temperature = value,
            }
        }

        if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
            sample.position = Some(Position { latitude, longitude });
        }

        Ok(sample)
    }

    /// Reads a field by its enum tag.
    ///
    /// Coordinates read as 0.0 when the sample carries no position.
    pub fn get(&self, field: TelemetryField) -> f64 {
        match field {
            TelemetryField::Latitude => self.position.map_or(0.0, |p| p.latitude),
            TelemetryField::Longitude => self.position.map_or(0.0, |p| p.longitude),
            TelemetryField::Speed => self.speed,
            TelemetryField::HeartRate => self.heart_rate,
            TelemetryField::Cadence => self.cadence,
            TelemetryField::Altitude => self.altitude,
            TelemetryField::Grade => self.grade,
            TelemetryField::Distance => self.distance,
            TelemetryField::Temperature => self.temperature,
        }
    }

    /// Reads a field by name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` for names outside [`TelemetryField`].
    pub fn get_by_name(&self, name: &str) -> Result<f64> {
        Ok(self.get(name.parse()?))
    }
}

impl fmt::Display for TelemetrySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let position = match self.position {
            Some(p) => format!("({:.6}, {:.6})", p.latitude, p.longitude),
            None => "none".to_string(),
        };
        write!(
            f,
            "{} pos={} speed={:.1}mph hr={:.0}bpm cad={:.0}rpm \
             alt={:.0}ft grade={:.0}% dist={:.2}mi temp={:.0}F",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            position,
            self.speed,
            self.heart_rate,
            self.cadence,
            self.altitude,
            self.grade,
            self.distance,
            self.temperature,
        )
    }
}
