//! # Photo Manifest
//!
//! JSON Lines listing of photos and their capture times, one object per line:
//!
//! ```text
//! {"path": "images/G0010001.JPG", "captured_at": "2013:06:22 07:05:20"}
//! {"path": "images/G0010002.JPG", "captured_at": "2013:06:22 07:05:30"}
//! ```
//!
//! Relative paths resolve against the manifest's directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::{parse_capture_time, resolve_path, PhotoSource, RawPhoto};
use crate::error::{RideLapseError, Result};

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    path: PathBuf,
    captured_at: String,
}

/// Photo source backed by a JSON Lines manifest
#[derive(Debug, Clone)]
pub struct PhotoManifest {
    path: PathBuf,
}

impl PhotoManifest {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses manifest text; relative photo paths resolve against `base`.
    ///
    /// # Errors
    ///
    /// Returns `PhotoManifest` naming the offending line for malformed JSON
    /// or an unreadable capture time.
    pub fn parse(contents: &str, base: &Path) -> Result<Vec<RawPhoto>> {
        let mut photos = Vec::new();

        for (number, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let entry: ManifestEntry = serde_json::from_str(line).map_err(|e| {
                RideLapseError::PhotoManifest(format!("line {}: {}", number + 1, e))
            })?;
            let captured_at = parse_capture_time(&entry.captured_at).map_err(|e| {
                RideLapseError::PhotoManifest(format!("line {}: {}", number + 1, e))
            })?;

            photos.push(RawPhoto {
                path: resolve_path(base, &entry.path),
                captured_at,
            });
        }

        Ok(photos)
    }
}

impl PhotoSource for PhotoManifest {
    fn photos(&self) -> Result<Vec<RawPhoto>> {
        debug!("Reading photo manifest {}", self.path.display());
        let contents = fs::read_to_string(&self.path)?;
        let base = self.path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&contents, base)
    }
}
