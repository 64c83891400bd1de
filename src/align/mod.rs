//! # Alignment Module
//!
//! Matches each photo to its slice of telemetry history.
//!
//! This module handles:
//! - Pre-flight overlap checks between photos and the telemetry track
//! - Per-photo window resolution in capture-time order
//! - Map refresh decisions based on distance travelled
//! - Status line composition (distance, clock, elapsed time, temperature)

pub mod driver;
pub mod overlap;
pub mod status;

pub use driver::{
    AlignmentDriver, Compositor, DriverOptions, FrameContext, MapArtifact, MapProvider,
    OutputIndex, RunSummary,
};
pub use overlap::{check_overlap, OverlapPolicy, OverlapValidator};
