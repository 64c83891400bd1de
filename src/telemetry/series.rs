//! # Telemetry Series
//!
//! Immutable, time-ordered sample storage with nearest-time lookups.
//!
//! ## Nearest match
//!
//! A query time `t` is located with two binary searches:
//!
//! - `left`: number of samples with timestamp `< t`
//! - `right`: number of samples with timestamp `<= t`
//!
//! If `left` reaches the end of the series, `t` is past the last sample and
//! the lookup reports [`NearestMatch::PastEnd`] instead of clamping. Otherwise
//! the closest neighbour wins, and an exact tie goes to the earlier sample.
//!
//! ## Usage
//!
//! ```
//! use std::num::NonZeroUsize;
//! use chrono::{Duration, TimeZone, Utc};
//! use ride_lapse::telemetry::{NearestMatch, TelemetrySample, TelemetrySeries};
//!
//! let start = Utc.with_ymd_and_hms(2013, 6, 22, 7, 0, 0).unwrap();
//! let series = TelemetrySeries::load(
//!     (0..=10).map(|i| TelemetrySample::new(start + Duration::seconds(i * 10))).collect(),
//! );
//!
//! // 14s is closer to the sample at 10s than the one at 20s
//! assert_eq!(series.nearest(start + Duration::seconds(14))?, NearestMatch::Found(1));
//!
//! let window = series.window(start + Duration::seconds(14), NonZeroUsize::new(5).unwrap())?;
//! assert_eq!(window.len(), 2);
//! assert_eq!(window.anchor().timestamp, start + Duration::seconds(10));
//! # Ok::<(), ride_lapse::error::RideLapseError>(())
//! ```

use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::sample::TelemetrySample;
use super::TelemetrySource;
use crate::error::{RideLapseError, Result};

/// Outcome of a nearest-time lookup on a non-empty series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearestMatch {
    /// Index of the closest sample
    Found(usize),
    /// The query time is strictly after the last sample
    PastEnd,
}

impl NearestMatch {
    /// Index of the match, or `None` past the end.
    pub fn index(self) -> Option<usize> {
        match self {
            NearestMatch::Found(index) => Some(index),
            NearestMatch::PastEnd => None,
        }
    }
}

/// Read-only view of consecutive samples ending at the anchor (nearest match).
#[derive(Debug, Clone, Copy)]
pub struct AlignmentWindow<'a> {
    samples: &'a [TelemetrySample],
    anchor: &'a TelemetrySample,
    start: usize,
}

impl<'a> AlignmentWindow<'a> {
    /// Samples oldest to newest; the last one is the anchor.
    pub fn samples(&self) -> &'a [TelemetrySample] {
        self.samples
    }

    /// The sample matched to the query time.
    pub fn anchor(&self) -> &'a TelemetrySample {
        self.anchor
    }

    /// Series index of the first sample in the window.
    pub fn start_index(&self) -> usize {
        self.start
    }

    /// Series index of the anchor.
    pub fn anchor_index(&self) -> usize {
        self.start + self.samples.len() - 1
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: a window holds at least its anchor.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'a, TelemetrySample> {
        self.samples.iter()
    }
}

/// Time-ordered telemetry samples, immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySeries {
    samples: Vec<TelemetrySample>,
}

impl TelemetrySeries {
    /// Builds a series from samples in any order.
    ///
    /// Samples are sorted by timestamp if they are not already (stable, so
    /// equal timestamps keep their input order). Cumulative distance is
    /// carried forward so it never decreases along the series; records that
    /// omit distance would otherwise read as zero mid-ride.
    ///
    /// An empty input is accepted; queries on it report `NoData`.
    pub fn load(mut samples: Vec<TelemetrySample>) -> Self {
        if !samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
            debug!("Telemetry samples out of order, sorting {} samples", samples.len());
            samples.sort_by_key(|s| s.timestamp);
        }

        let mut max_distance = 0.0_f64;
        for sample in &mut samples {
            if sample.distance < max_distance {
                sample.distance = max_distance;
            }
            max_distance = sample.distance;
        }

        Self { samples }
    }

    /// Reads, converts and loads every record of a telemetry source.
    ///
    /// # Errors
    ///
    /// Propagates source errors and field unit mismatches.
    pub fn from_source<S: TelemetrySource + ?Sized>(source: &S) -> Result<Self> {
        let samples = source
            .records()?
            .iter()
            .map(TelemetrySample::from_raw)
            .collect::<Result<Vec<_>>>()?;

        let series = Self::load(samples);
        match series.time_span() {
            Some((first, last)) => info!(
                "Loaded {} telemetry samples from {} to {}",
                series.len(),
                first,
                last
            ),
            None => info!("Loaded empty telemetry series"),
        }
        Ok(series)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TelemetrySample> {
        self.samples.get(index)
    }

    pub fn first(&self) -> Option<&TelemetrySample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&TelemetrySample> {
        self.samples.last()
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    /// First and last sample timestamps.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.first()?.timestamp, self.last()?.timestamp))
    }

    /// Distance of the whole ride in miles (the last sample's cumulative distance).
    pub fn total_distance(&self) -> f64 {
        self.last().map_or(0.0, |s| s.distance)
    }

    /// Finds the sample closest in time to `t`.
    ///
    /// Ties between an earlier and a later neighbour resolve to the earlier
    /// one. A query before the first sample matches index 0; a query after
    /// the last sample is [`NearestMatch::PastEnd`].
    ///
    /// # Errors
    ///
    /// Returns `NoData` if the series is empty.
    pub fn nearest(&self, t: DateTime<Utc>) -> Result<NearestMatch> {
        if self.samples.is_empty() {
            return Err(RideLapseError::NoData);
        }

        let len = self.samples.len();
        let left = self.samples.partition_point(|s| s.timestamp < t);
        let right = self.samples.partition_point(|s| s.timestamp <= t);

        if left >= len {
            return Ok(NearestMatch::PastEnd);
        }

        // Exact hit: samples[left..right] all sit at t.
        if left < right {
            return Ok(NearestMatch::Found(left));
        }

        // samples[left] is the first sample after t.
        if left == 0 {
            return Ok(NearestMatch::Found(0));
        }

        let before = left - 1;
        let gap_before = t - self.samples[before].timestamp;
        let gap_after = self.samples[left].timestamp - t;
        if gap_before <= gap_after {
            Ok(NearestMatch::Found(before))
        } else {
            Ok(NearestMatch::Found(left))
        }
    }

    /// Returns up to `max_len` samples ending at the nearest match to `t`.
    ///
    /// # Errors
    ///
    /// - `NoData`: the series is empty
    /// - `OutOfRange`: `t` is after the last sample
    pub fn window(&self, t: DateTime<Utc>, max_len: NonZeroUsize) -> Result<AlignmentWindow<'_>> {
        match self.nearest(t)? {
            NearestMatch::Found(index) => Ok(self.window_ending_at(index, max_len)),
            NearestMatch::PastEnd => Err(RideLapseError::OutOfRange {
                query: t,
                last: self.samples[self.samples.len() - 1].timestamp,
            }),
        }
    }

    /// Returns up to `max_len` samples ending at the last sample.
    ///
    /// # Errors
    ///
    /// Returns `NoData` if the series is empty.
    pub fn tail_window(&self, max_len: NonZeroUsize) -> Result<AlignmentWindow<'_>> {
        if self.samples.is_empty() {
            return Err(RideLapseError::NoData);
        }
        Ok(self.window_ending_at(self.samples.len() - 1, max_len))
    }

    fn window_ending_at(&self, index: usize, max_len: NonZeroUsize) -> AlignmentWindow<'_> {
        let start = (index + 1).saturating_sub(max_len.get());
        AlignmentWindow {
            samples: &self.samples[start..=index],
            anchor: &self.samples[index],
            start,
        }
    }
}
