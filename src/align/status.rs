//! # Status Line
//!
//! Text for the status bar composited under each photo.

use chrono::Duration;

use crate::telemetry::TelemetrySample;

/// Formats elapsed ride time as `H:MM`, truncating seconds.
pub fn format_elapsed(elapsed: Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Builds the status bar text for an anchor sample.
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use ride_lapse::align::status::status_line;
/// use ride_lapse::telemetry::TelemetrySample;
///
/// let mut anchor = TelemetrySample::new(Utc.with_ymd_and_hms(2013, 6, 22, 8, 35, 0).unwrap());
/// anchor.distance = 12.34;
/// anchor.temperature = 71.6;
///
/// assert_eq!(
///     status_line(&anchor, Duration::minutes(95), 40.0),
///     "Distance: 12.3 miles (40.0 miles to go) Time:  8:35 am (1:35 elapsed) Temp: 71F"
/// );
/// ```
pub fn status_line(anchor: &TelemetrySample, elapsed: Duration, remaining_miles: f64) -> String {
    format!(
        "Distance: {:.1} miles ({:.1} miles to go) Time: {} ({} elapsed) Temp: {}F",
        anchor.distance,
        remaining_miles,
        anchor.timestamp.format("%l:%M %P"),
        format_elapsed(elapsed),
        anchor.temperature.trunc() as i64,
    )
}
