//! # Alignment Driver
//!
//! Walks photos in capture-time order and assembles, for each one, the
//! telemetry window, map reference and status text handed to the compositor.
//!
//! ## Resume
//!
//! Photos whose output already exists are skipped without touching any
//! collaborator, so an interrupted run picks up where it stopped when started
//! again.
//!
//! ## Map reuse
//!
//! Map snapshots come from a rate-limited service. A new one is requested only
//! when the anchor's cumulative distance, rounded to a tenth of a mile,
//! differs from the previous photo's anchor. Otherwise the previous map
//! reference is reused.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, info};

use super::status::status_line;
use crate::error::{RideLapseError, Result};
use crate::photo::PhotoRecord;
use crate::telemetry::{AlignmentWindow, TelemetrySample, TelemetrySeries};

/// Default number of samples in a window (graph x-axis span)
pub const DEFAULT_WINDOW_LEN: usize = 100;

/// Reference to a map snapshot (file path or URL)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MapArtifact(pub String);

impl MapArtifact {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Answers whether a photo's final output already exists.
#[cfg_attr(test, mockall::automock)]
pub trait OutputIndex {
    fn output_exists(&self, photo: &PhotoRecord) -> bool;
}

/// Produces a map snapshot for an anchor sample.
#[cfg_attr(test, mockall::automock)]
pub trait MapProvider {
    /// # Errors
    ///
    /// Failures are reported as `Collaborator` errors and abort the run.
    fn snapshot(&mut self, photo: &PhotoRecord, anchor: &TelemetrySample) -> Result<MapArtifact>;
}

/// Turns a frame context into the final output artifact.
pub trait Compositor {
    /// # Errors
    ///
    /// Failures abort the run; completed frames stay on disk for resume.
    fn compose(&mut self, frame: &FrameContext<'_>) -> Result<PathBuf>;
}

/// Everything the compositor needs for one photo.
#[derive(Debug, Clone)]
pub struct FrameContext<'a> {
    pub photo: &'a PhotoRecord,
    pub window: AlignmentWindow<'a>,
    pub map: Option<MapArtifact>,
    pub status: String,
    /// Anchor time minus the first sample's time
    pub elapsed: Duration,
    /// Total ride distance minus anchor distance, in miles
    pub remaining_distance: f64,
}

impl<'a> FrameContext<'a> {
    pub fn anchor(&self) -> &'a TelemetrySample {
        self.window.anchor()
    }
}

/// Driver settings
#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    /// Maximum samples per window
    pub window_len: NonZeroUsize,
    /// Use the final window for photos taken after the last sample
    pub clamp_past_end: bool,
    /// Stop after this many photos have been processed (skips excluded)
    pub limit: Option<usize>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            window_len: NonZeroUsize::new(DEFAULT_WINDOW_LEN).unwrap_or(NonZeroUsize::MIN),
            clamp_past_end: true,
            limit: None,
        }
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub maps_fetched: usize,
    pub maps_reused: usize,
}

/// Whether the anchor moved far enough from the previous one to need a new map.
///
/// Distances are compared after rounding to one decimal place.
pub fn needs_new_map(
    previous: Option<&TelemetrySample>,
    current: &TelemetrySample,
    have_map: bool,
) -> bool {
    match previous {
        Some(previous) if have_map => {
            format!("{:.1}", previous.distance) != format!("{:.1}", current.distance)
        }
        _ => true,
    }
}

/// Per-photo alignment loop over an immutable telemetry series.
pub struct AlignmentDriver<'a, O, M, C> {
    series: &'a TelemetrySeries,
    options: DriverOptions,
    outputs: O,
    maps: M,
    compositor: C,
}

impl<'a, O, M, C> AlignmentDriver<'a, O, M, C>
where
    O: OutputIndex,
    M: MapProvider,
    C: Compositor,
{
    pub fn new(
        series: &'a TelemetrySeries,
        options: DriverOptions,
        outputs: O,
        maps: M,
        compositor: C,
    ) -> Self {
        Self {
            series,
            options,
            outputs,
            maps,
            compositor,
        }
    }

    /// Processes every photo in ascending capture-time order.
    ///
    /// Overlap should already have been validated; this does not repeat it.
    ///
    /// # Errors
    ///
    /// - `NoData`: the series is empty
    /// - `OutOfRange`: a photo is after the last sample and clamping is off
    /// - Any collaborator failure
    pub fn run(&mut self, photos: &[PhotoRecord]) -> Result<RunSummary> {
        let series = self.series;
        let first = series.first().ok_or(RideLapseError::NoData)?;
        let total_distance = series.total_distance();

        let mut ordered: Vec<&PhotoRecord> = photos.iter().collect();
        ordered.sort_by_key(|p| p.capture_time);

        let mut summary = RunSummary::default();
        let mut previous_anchor: Option<&TelemetrySample> = None;
        let mut map: Option<MapArtifact> = None;

        for photo in ordered {
            if let Some(limit) = self.options.limit {
                if summary.processed >= limit {
                    info!("Stopping after {} photo(s)", summary.processed);
                    break;
                }
            }

            if self.outputs.output_exists(photo) {
                debug!("Skipping {}, output exists", photo.path.display());
                summary.skipped += 1;
                continue;
            }
            info!("Processing {}", photo.path.display());

            let window = self.resolve_window(series, photo)?;
            let anchor = window.anchor();

            if needs_new_map(previous_anchor, anchor, map.is_some()) {
                if anchor.position.is_some() {
                    map = Some(self.maps.snapshot(photo, anchor)?);
                    summary.maps_fetched += 1;
                } else {
                    debug!("Anchor at {} has no position, keeping previous map", anchor.timestamp);
                }
            } else {
                debug!("Distance unchanged at {:.1} miles, using last map", anchor.distance);
                summary.maps_reused += 1;
            }

            let elapsed = anchor.timestamp - first.timestamp;
            let remaining_distance = total_distance - anchor.distance;
            let frame = FrameContext {
                photo,
                window,
                map: map.clone(),
                status: status_line(anchor, elapsed, remaining_distance),
                elapsed,
                remaining_distance,
            };

            let output = self.compositor.compose(&frame)?;
            info!("Wrote {}", output.display());

            previous_anchor = Some(anchor);
            summary.processed += 1;
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            maps_fetched = summary.maps_fetched,
            maps_reused = summary.maps_reused,
            "Alignment run finished"
        );
        Ok(summary)
    }

    fn resolve_window(
        &self,
        series: &'a TelemetrySeries,
        photo: &PhotoRecord,
    ) -> Result<AlignmentWindow<'a>> {
        match series.window(photo.capture_time, self.options.window_len) {
            Err(RideLapseError::OutOfRange { .. }) if self.options.clamp_past_end => {
                debug!("{} is after the last sample, using final window", photo.path.display());
                series.tail_window(self.options.window_len)
            }
            other => other,
        }
    }

    /// Consumes the driver, returning its collaborators.
    pub fn into_parts(self) -> (O, M, C) {
        (self.outputs, self.maps, self.compositor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Position;
    use chrono::{DateTime, TimeZone, Utc};
    use mockall::predicate::always;
    use std::collections::HashSet;

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 6, 22, 7, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    /// Samples every 10s; distance grows 0.02 miles per sample, so the
    /// rounded distance changes every few samples.
    fn series() -> TelemetrySeries {
        TelemetrySeries::load(
            (0..=20)
                .map(|i| {
                    let mut s = TelemetrySample::new(t(i * 10));
                    s.distance = i as f64 * 0.02;
                    s.position = Some(Position {
                        latitude: 47.6,
                        longitude: -122.3 + i as f64 * 0.001,
                    });
                    s
                })
                .collect(),
        )
    }

    fn photos(times: &[i64]) -> Vec<PhotoRecord> {
        times
            .iter()
            .map(|&s| PhotoRecord::new(format!("/img/G{:04}.JPG", s), t(s)))
            .collect()
    }

    fn options(window_len: usize) -> DriverOptions {
        DriverOptions {
            window_len: NonZeroUsize::new(window_len).unwrap(),
            ..DriverOptions::default()
        }
    }

    #[derive(Debug, Clone)]
    struct Recorded {
        photo: PathBuf,
        window_len: usize,
        anchor_time: DateTime<Utc>,
        map: Option<MapArtifact>,
        status: String,
        remaining: f64,
    }

    /// Compositor that records every frame it receives
    #[derive(Default)]
    struct RecordingCompositor {
        frames: Vec<Recorded>,
        fail_on: Option<PathBuf>,
    }

    impl Compositor for RecordingCompositor {
        fn compose(&mut self, frame: &FrameContext<'_>) -> Result<PathBuf> {
            if self.fail_on.as_deref() == Some(frame.photo.path.as_path()) {
                let message = "convert exited with status 1".to_string();
                return Err(RideLapseError::Collaborator(message));
            }
            self.frames.push(Recorded {
                photo: frame.photo.path.clone(),
                window_len: frame.window.len(),
                anchor_time: frame.anchor().timestamp,
                map: frame.map.clone(),
                status: frame.status.clone(),
                remaining: frame.remaining_distance,
            });
            Ok(PathBuf::from(format!("/out/merged-{}.json", frame.photo.file_name())))
        }
    }

    fn recording_driver<O: OutputIndex, M: MapProvider>(
        series: &TelemetrySeries,
        options: DriverOptions,
        outputs: O,
        maps: M,
    ) -> AlignmentDriver<'_, O, M, RecordingCompositor> {
        AlignmentDriver::new(series, options, outputs, maps, RecordingCompositor::default())
    }

    fn no_outputs() -> MockOutputIndex {
        let mut outputs = MockOutputIndex::new();
        outputs.expect_output_exists().returning(|_| false);
        outputs
    }

    fn counting_maps() -> MockMapProvider {
        let mut maps = MockMapProvider::new();
        maps.expect_snapshot()
            .with(always(), always())
            .returning(|photo, _| Ok(MapArtifact(format!("map-{}.url", photo.file_name()))));
        maps
    }

    #[test]
    fn test_windows_and_status_for_each_photo() {
        let series = series();
        let photos = photos(&[0, 44, 200]);
        let mut driver = recording_driver(&series, options(3), no_outputs(), counting_maps());

        let summary = driver.run(&photos).unwrap();
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.skipped, 0);

        let (_, _, compositor) = driver.into_parts();
        let frames = compositor.frames;
        assert_eq!(frames[0].window_len, 1);
        assert_eq!(frames[0].anchor_time, t(0));
        assert_eq!(frames[1].window_len, 3);
        assert_eq!(frames[1].anchor_time, t(40));
        assert_eq!(frames[2].anchor_time, t(200));

        let status = &frames[1].status;
        assert!(status.starts_with("Distance: 0.1 miles (0.3 miles to go)"), "{}", status);
        assert!(frames[1].status.contains("(0:00 elapsed)"));
        assert!((frames[1].remaining - 0.32).abs() < 1e-9);
        assert!((frames[2].remaining).abs() < 1e-9);
    }

    #[test]
    fn test_photos_processed_in_capture_order() {
        let series = series();
        let photos = photos(&[150, 20, 90]);
        let mut driver = recording_driver(&series, options(5), no_outputs(), counting_maps());
        driver.run(&photos).unwrap();

        let (_, _, compositor) = driver.into_parts();
        let order: Vec<_> = compositor.frames.iter().map(|f| f.anchor_time).collect();
        assert_eq!(order, vec![t(20), t(90), t(150)]);
    }

    #[test]
    fn test_map_reused_while_rounded_distance_unchanged() {
        let series = series();
        // Anchors at 0.00, 0.02, 0.04 (all 0.0) then 0.10 (0.1) then 0.12 (0.1)
        let photos = photos(&[0, 10, 20, 50, 60]);
        let mut maps = MockMapProvider::new();
        maps.expect_snapshot()
            .times(2)
            .returning(|photo, _| Ok(MapArtifact(format!("map-{}.url", photo.file_name()))));

        let mut driver = recording_driver(&series, options(5), no_outputs(), maps);
        let summary = driver.run(&photos).unwrap();
        assert_eq!(summary.maps_fetched, 2);
        assert_eq!(summary.maps_reused, 3);

        let (_, _, compositor) = driver.into_parts();
        let maps: Vec<_> = compositor.frames.iter().map(|f| f.map.clone().unwrap().0).collect();
        assert_eq!(
            maps,
            vec![
                "map-G0000.JPG.url",
                "map-G0000.JPG.url",
                "map-G0000.JPG.url",
                "map-G0050.JPG.url",
                "map-G0050.JPG.url",
            ]
        );
    }

    #[test]
    fn test_anchor_without_position_skips_map_call() {
        let series =
            TelemetrySeries::load(vec![TelemetrySample::new(t(0)), TelemetrySample::new(t(10))]);
        let mut maps = MockMapProvider::new();
        maps.expect_snapshot().never();

        let mut driver = recording_driver(&series, options(5), no_outputs(), maps);
        let summary = driver.run(&photos(&[0, 10])).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.maps_fetched, 0);

        let (_, _, compositor) = driver.into_parts();
        assert!(compositor.frames.iter().all(|f| f.map.is_none()));
    }

    #[test]
    fn test_existing_outputs_are_skipped() {
        let series = series();
        let photos = photos(&[0, 50, 100]);
        let done: HashSet<PathBuf> =
            ["/img/G0000.JPG", "/img/G0100.JPG"].into_iter().map(PathBuf::from).collect();

        let mut outputs = MockOutputIndex::new();
        outputs.expect_output_exists().returning(move |photo| done.contains(&photo.path));

        let mut driver = recording_driver(&series, options(5), outputs, counting_maps());
        let summary = driver.run(&photos).unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 2);

        let (_, _, compositor) = driver.into_parts();
        assert_eq!(compositor.frames.len(), 1);
        assert_eq!(compositor.frames[0].photo, PathBuf::from("/img/G0050.JPG"));
    }

    #[test]
    fn test_rerun_with_all_outputs_does_no_work() {
        let series = series();
        let photos = photos(&[0, 50, 100, 150]);

        let mut outputs = MockOutputIndex::new();
        outputs.expect_output_exists().times(4).returning(|_| true);
        let mut maps = MockMapProvider::new();
        maps.expect_snapshot().never();

        let mut driver = recording_driver(&series, options(5), outputs, maps);
        let summary = driver.run(&photos).unwrap();
        assert_eq!(
            summary,
            RunSummary { processed: 0, skipped: 4, maps_fetched: 0, maps_reused: 0 }
        );

        let (_, _, compositor) = driver.into_parts();
        assert!(compositor.frames.is_empty());
    }

    #[test]
    fn test_past_end_without_clamp_is_out_of_range() {
        let series = series();
        let opts = DriverOptions { clamp_past_end: false, ..options(5) };
        let mut driver = recording_driver(&series, opts, no_outputs(), counting_maps());

        assert!(matches!(driver.run(&photos(&[100, 250])), Err(RideLapseError::OutOfRange { .. })));
        let (_, _, compositor) = driver.into_parts();
        assert_eq!(compositor.frames.len(), 1);
    }

    #[test]
    fn test_past_end_with_clamp_uses_final_window() {
        let series = series();
        let mut driver = recording_driver(&series, options(4), no_outputs(), counting_maps());
        driver.run(&photos(&[250])).unwrap();

        let (_, _, compositor) = driver.into_parts();
        assert_eq!(compositor.frames[0].anchor_time, t(200));
        assert_eq!(compositor.frames[0].window_len, 4);
    }

    #[test]
    fn test_limit_stops_after_processed_photos() {
        let series = series();
        let photos = photos(&[0, 50, 100]);

        let mut outputs = MockOutputIndex::new();
        outputs
            .expect_output_exists()
            .returning(|photo| photo.path == PathBuf::from("/img/G0000.JPG"));

        let opts = DriverOptions { limit: Some(1), ..options(5) };
        let mut driver = recording_driver(&series, opts, outputs, counting_maps());
        let summary = driver.run(&photos).unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 1);

        let (_, _, compositor) = driver.into_parts();
        assert_eq!(compositor.frames[0].photo, PathBuf::from("/img/G0050.JPG"));
    }

    #[test]
    fn test_compositor_failure_aborts_run() {
        let series = series();
        let compositor = RecordingCompositor {
            fail_on: Some(PathBuf::from("/img/G0050.JPG")),
            ..RecordingCompositor::default()
        };
        let mut driver =
            AlignmentDriver::new(&series, options(5), no_outputs(), counting_maps(), compositor);

        assert!(matches!(driver.run(&photos(&[0, 50, 100])), Err(RideLapseError::Collaborator(_))));
        let (_, _, compositor) = driver.into_parts();
        assert_eq!(compositor.frames.len(), 1);
    }

    #[test]
    fn test_map_failure_aborts_run() {
        let series = series();
        let mut maps = MockMapProvider::new();
        maps.expect_snapshot()
            .returning(|_, _| Err(RideLapseError::Collaborator("HTTP 403".to_string())));

        let mut driver = recording_driver(&series, options(5), no_outputs(), maps);
        assert!(matches!(driver.run(&photos(&[0])), Err(RideLapseError::Collaborator(_))));
    }

    #[test]
    fn test_empty_series_is_no_data() {
        let series = TelemetrySeries::default();
        let mut driver = recording_driver(&series, options(5), no_outputs(), counting_maps());
        assert!(matches!(driver.run(&photos(&[0])), Err(RideLapseError::NoData)));
    }

    #[test]
    fn test_needs_new_map() {
        let mut a = TelemetrySample::new(t(0));
        let mut b = TelemetrySample::new(t(10));
        a.distance = 1.04;
        b.distance = 1.01;
        assert!(!needs_new_map(Some(&a), &b, true));
        assert!(needs_new_map(Some(&a), &b, false));
        assert!(needs_new_map(None, &b, true));
        b.distance = 1.06;
        assert!(needs_new_map(Some(&a), &b, true));
    }
}
