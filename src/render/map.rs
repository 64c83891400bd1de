//! # Static Map Snapshots
//!
//! Records a static-map URL centred on the anchor position. The map service
//! throttles aggressively, so a snapshot already on disk is reused as-is and
//! every new one is preceded by a configurable delay.

use std::fs;
use std::thread;
use std::time::Duration;

use tracing::info;

use super::staging::StagingDir;
use crate::align::{MapArtifact, MapProvider};
use crate::config::MapConfig;
use crate::error::{RideLapseError, Result};
use crate::photo::PhotoRecord;
use crate::telemetry::{Position, TelemetrySample};

/// Map provider writing `map-<file name>.url` files into the staging directory
#[derive(Debug, Clone)]
pub struct StaticMapProvider {
    staging: StagingDir,
    base_url: String,
    size_px: u32,
    zoom: u8,
    marker_color: String,
    delay: Duration,
}

impl StaticMapProvider {
    pub fn new(staging: StagingDir, config: &MapConfig) -> Self {
        Self {
            staging,
            base_url: config.base_url.clone(),
            size_px: config.size_px,
            zoom: config.zoom,
            marker_color: config.marker_color.clone(),
            delay: Duration::from_secs(config.delay_s),
        }
    }

    /// Static map URL with a single marker at `position`.
    pub fn url_for(&self, position: Position) -> String {
        format!(
            "{}?size={}x{}&markers=color:{}%7C{:.6},{:.6}&zoom={}",
            self.base_url,
            self.size_px,
            self.size_px,
            self.marker_color,
            position.latitude,
            position.longitude,
            self.zoom,
        )
    }
}

impl MapProvider for StaticMapProvider {
    fn snapshot(&mut self, photo: &PhotoRecord, anchor: &TelemetrySample) -> Result<MapArtifact> {
        let path = self.staging.map_path(photo);
        let artifact = MapArtifact(path.display().to_string());
        if path.exists() {
            info!("Map already exists for {}", anchor);
            return Ok(artifact);
        }

        let position = anchor.position.ok_or_else(|| {
            RideLapseError::Collaborator(format!("no position at {}", anchor.timestamp))
        })?;

        info!("Getting map for {}", anchor);
        if !self.delay.is_zero() {
            info!("Sleeping {} seconds", self.delay.as_secs());
            thread::sleep(self.delay);
        }

        fs::write(&path, self.url_for(position)).map_err(|e| {
            RideLapseError::Collaborator(format!("failed to write {}: {}", path.display(), e))
        })?;
        Ok(artifact)
    }
}
