//! Threshold crossing detection.
//!
//! Only upward crossings (below → at/above) are reported. Clock is injected
//! through `now` so tests stay deterministic.

use chrono::{DateTime, Duration, Utc};

use crate::model::{Point, ThresholdCrossing};

/// Samples this far before `now` are still scanned, so a crossing between
/// the last observation and the first future sample can be interpolated.
pub const TRAILING_WINDOW_MINUTES: i64 = 6;

/// Interpolates the instant between `prev` and `curr` where the line through
/// them reaches `threshold`.
///
/// The fraction is clamped to `[0, 1]`. Equal values return `curr.t`.
pub fn interpolate_crossing(prev: &Point, curr: &Point, threshold: f64) -> DateTime<Utc> {
    let rise = curr.v - prev.v;
    if rise == 0.0 {
        return curr.t;
    }
    let frac = ((threshold - prev.v) / rise).clamp(0.0, 1.0);
    let span_ms = (curr.t - prev.t).num_milliseconds() as f64;
    prev.t + Duration::milliseconds((frac * span_ms).round() as i64)
}

/// Rounds half toward positive infinity, so -2.5 becomes -2.
fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Finds the first upward crossing of `threshold` at or after
/// `now - TRAILING_WINDOW_MINUTES`.
///
/// `points` must be time-ascending. Returns `None` when fewer than two
/// samples qualify or nothing rises through the threshold.
pub fn find_next_threshold_crossing(
    points: &[Point],
    threshold: f64,
    now: DateTime<Utc>,
) -> Option<ThresholdCrossing> {
    let cutoff = now - Duration::minutes(TRAILING_WINDOW_MINUTES);
    let start = points.partition_point(|p| p.t < cutoff);
    let window = &points[start..];
    if window.len() < 2 {
        return None;
    }

    window
        .windows(2)
        .find(|pair| pair[0].v < threshold && threshold <= pair[1].v)
        .map(|pair| {
            let crossing_time = interpolate_crossing(&pair[0], &pair[1], threshold);
            let lead_ms = (crossing_time - now).num_milliseconds() as f64;
            ThresholdCrossing {
                crossing_time,
                lead_minutes: round_half_up(lead_ms / 60_000.0),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 13, 0, 0).unwrap()
    }

    fn at(minutes: i64, v: f64) -> Point {
        Point::new(t0() + Duration::minutes(minutes), v)
    }

    #[test]
    fn test_midpoint_crossing_is_exact() {
        let points = [at(0, 5.0), at(6, 7.0)];
        let now = t0() - Duration::minutes(30);
        let crossing = find_next_threshold_crossing(&points, 6.0, now).expect("should cross");
        assert_eq!(crossing.crossing_time, t0() + Duration::minutes(3));
        assert_eq!(crossing.lead_minutes, 33);
    }

    #[test]
    fn test_crossing_at_forty_percent_of_interval() {
        // 4.0 → 4.5 through 4.2 lands 144 s into the 6-minute step.
        let points = [at(0, 4.0), at(6, 4.5)];
        let crossing = find_next_threshold_crossing(&points, 4.2, t0()).expect("should cross");
        assert_eq!(crossing.crossing_time, t0() + Duration::seconds(144));
        assert_eq!(crossing.lead_minutes, 2);
    }

    #[test]
    fn test_reaching_threshold_exactly_counts_as_crossing() {
        let points = [at(0, 3.0), at(6, 4.0)];
        let crossing = find_next_threshold_crossing(&points, 4.0, t0()).expect("at threshold is a crossing");
        assert_eq!(crossing.crossing_time, t0() + Duration::minutes(6));
    }

    #[test]
    fn test_decreasing_series_never_crosses() {
        let points = [at(0, 6.0), at(6, 5.0), at(12, 4.0), at(18, 3.0)];
        assert_eq!(find_next_threshold_crossing(&points, 4.5, t0()), None);
    }

    #[test]
    fn test_flat_series_never_crosses() {
        let below = [at(0, 3.0), at(6, 3.0), at(12, 3.0)];
        assert_eq!(find_next_threshold_crossing(&below, 4.0, t0()), None);
        // Flat at the threshold never starts below it either.
        let on = [at(0, 4.0), at(6, 4.0)];
        assert_eq!(find_next_threshold_crossing(&on, 4.0, t0()), None);
    }

    #[test]
    fn test_needs_two_samples_in_window() {
        assert_eq!(find_next_threshold_crossing(&[at(0, 9.0)], 4.0, t0()), None);
        assert_eq!(find_next_threshold_crossing(&[], 4.0, t0()), None);
        // Old samples are outside the window even if they cross.
        let stale = [at(-60, 1.0), at(-54, 9.0), at(0, 9.5)];
        assert_eq!(find_next_threshold_crossing(&stale, 4.0, t0()), None);
    }

    #[test]
    fn test_trailing_sample_yields_negative_lead() {
        // Crossing lands 3 minutes before now thanks to the trailing sample.
        let points = [at(-6, 1.0), at(0, 3.0)];
        let crossing = find_next_threshold_crossing(&points, 2.0, t0()).expect("should cross");
        assert_eq!(crossing.crossing_time, t0() - Duration::minutes(3));
        assert_eq!(crossing.lead_minutes, -3);
    }

    #[test]
    fn test_first_upward_crossing_wins() {
        let points = [at(0, 1.0), at(6, 5.0), at(12, 1.0), at(18, 5.0)];
        let crossing = find_next_threshold_crossing(&points, 3.0, t0()).unwrap();
        assert_eq!(crossing.crossing_time, t0() + Duration::minutes(3));
    }

    #[test]
    fn test_interpolate_equal_values_uses_current_time() {
        assert_eq!(interpolate_crossing(&at(0, 2.0), &at(6, 2.0), 2.0), t0() + Duration::minutes(6));
    }

    #[test]
    fn test_round_half_up_matches_browser_rounding() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
    }
}
