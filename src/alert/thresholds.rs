//! Flood threshold status.
//!
//! Turns an adjusted forecast into the one status line a user sees: already
//! at flood level, rising toward it, or clear. Notification dispatch and
//! cooldowns would also live here.

use chrono::{DateTime, Utc};

use crate::forecast::find_next_threshold_crossing;
use crate::model::{Point, ThresholdCrossing, nearest_point_within_tolerance};

/// Where the adjusted series stands relative to the flood threshold.
#[derive(Debug, Clone, PartialEq)]
pub enum FloodStatus {
    /// The adjusted level nearest `now` is at or above the threshold.
    Flooding { level: f64 },
    /// Below the threshold now, with an upward crossing ahead.
    Rising { crossing: ThresholdCrossing },
    /// No crossing anywhere in the forecast window.
    Clear,
}

impl FloodStatus {
    /// One-line human summary.
    pub fn message(&self, threshold: f64, unit_label: &str) -> String {
        match self {
            FloodStatus::Flooding { level } => format!(
                "FLOODING: adjusted level {:.2} {} is at or above the {:.2} {} threshold",
                level, unit_label, threshold, unit_label
            ),
            FloodStatus::Rising { crossing } => format!(
                "Threshold {:.2} {} expected at {} (in {} min)",
                threshold,
                unit_label,
                crossing.crossing_time.format("%Y-%m-%d %H:%M UTC"),
                crossing.lead_minutes
            ),
            FloodStatus::Clear => format!(
                "No crossing of {:.2} {} in the forecast window",
                threshold, unit_label
            ),
        }
    }

    pub fn is_flooding(&self) -> bool {
        matches!(self, FloodStatus::Flooding { .. })
    }
}

/// Classifies time-ascending adjusted points against `threshold` at `now`.
///
/// `Flooding` wins over `Rising`; a level with no sample within tolerance
/// of `now` is treated as unknown and falls through to the crossing scan.
pub fn assess_flood_status(adjusted: &[Point], threshold: f64, now: DateTime<Utc>) -> FloodStatus {
    if let Some(current) = nearest_point_within_tolerance(adjusted, now) {
        if current.v >= threshold {
            return FloodStatus::Flooding { level: current.v };
        }
    }

    match find_next_threshold_crossing(adjusted, threshold, now) {
        Some(crossing) => FloodStatus::Rising { crossing },
        None => FloodStatus::Clear,
    }
}
