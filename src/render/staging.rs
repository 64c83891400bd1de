//! # Staging Directory
//!
//! Where per-photo artifacts live:
//!
//! - `merged-<file name>.json`: final frame context for a photo
//! - `map-<file name>.url`: map snapshot reference

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::align::OutputIndex;
use crate::error::Result;
use crate::photo::PhotoRecord;

/// Artifact directory shared by the map provider and the sheet writer
#[derive(Debug, Clone)]
pub struct StagingDir {
    root: PathBuf,
}

impl StagingDir {
    /// Opens the staging directory, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            info!("Making {}", root.display());
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final output for a photo.
    pub fn output_path(&self, photo: &PhotoRecord) -> PathBuf {
        self.root.join(format!("merged-{}.json", photo.file_name()))
    }

    /// Map snapshot reference for a photo.
    pub fn map_path(&self, photo: &PhotoRecord) -> PathBuf {
        self.root.join(format!("map-{}.url", photo.file_name()))
    }
}

impl OutputIndex for StagingDir {
    fn output_exists(&self, photo: &PhotoRecord) -> bool {
        self.output_path(photo).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_create_makes_missing_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("staging");
        let staging = StagingDir::create(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(staging.root(), root.as_path());
    }

    #[test]
    fn test_artifact_names() {
        let staging = StagingDir { root: PathBuf::from("/tmp/stage") };
        let photo = PhotoRecord::new("/images/G0010042.JPG", Utc::now());
        assert_eq!(
            staging.output_path(&photo),
            PathBuf::from("/tmp/stage/merged-G0010042.JPG.json")
        );
        assert_eq!(staging.map_path(&photo), PathBuf::from("/tmp/stage/map-G0010042.JPG.url"));
    }

    #[test]
    fn test_extension_variants_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let staging = StagingDir::create(temp.path()).unwrap();
        let upper = PhotoRecord::new("G001.JPG", Utc::now());
        let lower = PhotoRecord::new("G001.jpg", Utc::now());

        assert_ne!(staging.output_path(&upper), staging.output_path(&lower));
        fs::write(staging.output_path(&upper), "{}").unwrap();
        assert!(staging.output_exists(&upper));
        assert!(!staging.output_exists(&lower));
    }

    #[test]
    fn test_output_exists() {
        let temp = TempDir::new().unwrap();
        let staging = StagingDir::create(temp.path()).unwrap();
        let photo = PhotoRecord::new("G001.JPG", Utc::now());

        assert!(!staging.output_exists(&photo));
        fs::write(staging.output_path(&photo), "{}").unwrap();
        assert!(staging.output_exists(&photo));
    }
}
