//! # Ride Lapse Library
//!
//! Align timelapse photos with a bike computer's GPS track.
//!
//! This library provides the core functionality for matching every photo to
//! the telemetry sample nearest its capture time, and for producing the
//! per-photo frame context (status bar, map reference, trailing graph window)
//! that a compositor turns into the final frame.

pub mod align;
pub mod config;
pub mod error;
pub mod photo;
pub mod pipeline;
pub mod render;
pub mod telemetry;
