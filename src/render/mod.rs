//! # Render Module
//!
//! File-backed collaborators for the alignment driver.
//!
//! This module handles:
//! - Naming and locating per-photo artifacts in the staging directory
//! - Recording static map snapshots for anchor positions
//! - Writing per-photo frame context sheets (status, map, graph series)

pub mod map;
pub mod sheet;
pub mod staging;

pub use map::StaticMapProvider;
pub use sheet::ContextSheetWriter;
pub use staging::StagingDir;
