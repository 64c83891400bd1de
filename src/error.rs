//! # Error Types
//!
//! Custom error types for Ride Lapse using `thiserror`.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for Ride Lapse
#[derive(Debug, Error)]
pub enum RideLapseError {
    /// A query was made against a series with no samples
    #[error("telemetry series has no samples")]
    NoData,

    /// Query time falls strictly after the last sample
    #[error("query time {query} is after the last telemetry sample at {last}")]
    OutOfRange {
        query: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    /// No photos to align
    #[error("no images found")]
    NoImages,

    /// Telemetry track is empty
    #[error("GPS track has 0 points")]
    NoTelemetry,

    /// Photo and telemetry time ranges do not intersect
    #[error("images and telemetry do not overlap: {0}")]
    RangeMismatch(String),

    /// A photo's nearest sample is further away than the configured limit
    #[error("no telemetry within {max_gap_s}s of {photo}: nearest sample is {gap_s}s away")]
    TelemetryGap {
        photo: String,
        gap_s: i64,
        max_gap_s: i64,
    },

    /// Failure reported by a map, render or output collaborator
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// Telemetry field name outside the field table
    #[error("unknown telemetry field: {0}")]
    UnknownField(String),

    /// A known telemetry field arrived with an unexpected unit
    #[error("field '{field}' has unit '{found}', expected '{expected}'")]
    UnitMismatch {
        field: String,
        expected: &'static str,
        found: String,
    },

    /// Telemetry file could not be decoded
    #[error("telemetry parse error: {0}")]
    TelemetryParse(String),

    /// Photo manifest could not be read
    #[error("photo manifest error: {0}")]
    PhotoManifest(String),

    /// Timestamp text did not match any accepted layout
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Ride Lapse
pub type Result<T> = std::result::Result<T, RideLapseError>;
