//! # FIT File Source
//!
//! Reads `record` messages from Garmin FIT activity files.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::Utc;
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};
use tracing::{debug, info};

use super::{RawField, RawRecord, TelemetrySource};
use crate::error::{RideLapseError, Result};

/// Telemetry source backed by a FIT file on disk
#[derive(Debug, Clone)]
pub struct FitFile {
    path: PathBuf,
}

impl FitFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySource for FitFile {
    fn records(&self) -> Result<Vec<RawRecord>> {
        info!("Loading activity {}", self.path.display());
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        let messages = fitparser::from_reader(&mut reader).map_err(|e| {
            RideLapseError::TelemetryParse(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(records_from_messages(messages))
    }
}

/// Keeps `record` messages that carry a timestamp and flattens their numeric fields.
fn records_from_messages(messages: Vec<FitDataRecord>) -> Vec<RawRecord> {
    let total = messages.len();
    let mut out = Vec::new();

    for message in messages {
        if message.kind() != MesgNum::Record {
            continue;
        }

        let mut timestamp = None;
        let mut fields = Vec::new();
        for field in message.fields() {
            match field.value() {
                Value::Timestamp(ts) if field.name() == "timestamp" => {
                    timestamp = Some(ts.with_timezone(&Utc));
                }
                value => {
                    if let Some(v) = fit_value_to_f64(value) {
                        fields.push(RawField::new(field.name(), v, field.units()));
                    }
                }
            }
        }

        if let Some(timestamp) = timestamp {
            out.push(RawRecord { timestamp, fields });
        }
    }

    debug!("Kept {} record messages out of {}", out.len(), total);
    out
}

fn fit_value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float32(v) => Some(*v as f64),
        Value::Float64(v) => Some(*v),
        Value::SInt8(v) => Some(*v as f64),
        Value::UInt8(v) => Some(*v as f64),
        Value::UInt8z(v) => Some(*v as f64),
        Value::Byte(v) => Some(*v as f64),
        Value::SInt16(v) => Some(*v as f64),
        Value::UInt16(v) => Some(*v as f64),
        Value::UInt16z(v) => Some(*v as f64),
        Value::SInt32(v) => Some(*v as f64),
        Value::UInt32(v) => Some(*v as f64),
        Value::UInt32z(v) => Some(*v as f64),
        Value::SInt64(v) => Some(*v as f64),
        Value::UInt64(v) => Some(*v as f64),
        Value::UInt64z(v) => Some(*v as f64),
        Value::Array(values) => values.iter().find_map(fit_value_to_f64),
        _ => None,
    }
}
