/// Core data types for the FloodCast tide and surge service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O, only types and the timestamp key format.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Timestamp keys
// ---------------------------------------------------------------------------

/// Format of every `TimeSeries` key: minute-truncated UTC, e.g. "2024-01-15T12:06Z".
pub const KEY_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// Sampling cadence of the CO-OPS water level and prediction products.
pub const DEFAULT_INTERVAL_MINUTES: u32 = 6;

/// Formats an instant as a series key, dropping seconds.
pub fn format_key(t: DateTime<Utc>) -> String {
    t.format(KEY_FORMAT).to_string()
}

/// Parses a series key back into an instant. Returns `None` for anything
/// not in `KEY_FORMAT`.
pub fn parse_key(key: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(key, KEY_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Series types
// ---------------------------------------------------------------------------

/// Water levels keyed by minute-resolution UTC timestamp.
///
/// Keys are fixed-width, so the ordered map iterates in time order. Two
/// instances usually live side by side: observed and predicted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    values: BTreeMap<String, f64>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value at the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Merges `other` into `self`; values from `other` win on shared keys.
    pub fn extend_from(&mut self, other: &TimeSeries) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }

    /// Converts entries to points sorted ascending by time.
    ///
    /// Keys that do not parse as timestamps are skipped.
    pub fn to_points(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self
            .values
            .iter()
            .filter_map(|(k, v)| parse_key(k).map(|t| Point { t, v: *v }))
            .collect();
        points.sort_by_key(|p| p.t);
        points
    }
}

impl FromIterator<(String, f64)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        TimeSeries {
            values: iter.into_iter().collect(),
        }
    }
}

/// A single sample placed on the time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub t: DateTime<Utc>,
    pub v: f64,
}

impl Point {
    pub fn new(t: DateTime<Utc>, v: f64) -> Self {
        Point { t, v }
    }
}

/// Widest gap at which a sample still counts as "at" a given instant:
/// one 6-minute step plus slack.
pub const SAMPLE_TOLERANCE_MINUTES: i64 = 9;

/// Nearest point to `t` by absolute time distance in a time-ascending slice.
///
/// Ties go to the earlier point.
pub fn nearest_point(points: &[Point], t: DateTime<Utc>) -> Option<Point> {
    let idx = points.partition_point(|p| p.t < t);
    let before = idx.checked_sub(1).and_then(|i| points.get(i));
    let after = points.get(idx);
    match (before, after) {
        (Some(b), Some(a)) => {
            if (t - b.t) <= (a.t - t) { Some(*b) } else { Some(*a) }
        }
        (Some(only), None) | (None, Some(only)) => Some(*only),
        (None, None) => None,
    }
}

/// Nearest point to `t`, but only if it lies within `SAMPLE_TOLERANCE_MINUTES`.
pub fn nearest_point_within_tolerance(points: &[Point], t: DateTime<Utc>) -> Option<Point> {
    nearest_point(points, t)
        .filter(|p| (p.t - t).num_seconds().abs() <= SAMPLE_TOLERANCE_MINUTES * 60)
}

// ---------------------------------------------------------------------------
// Forecast results
// ---------------------------------------------------------------------------

/// Median observed-minus-predicted difference and the number of paired
/// samples it was computed from. `n == 0` always carries `offset == 0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurgeEstimate {
    pub offset: f64,
    pub n: usize,
}

/// Interpolated moment a series first rises to a threshold.
///
/// `lead_minutes` is signed; negative means the crossing lies just before
/// `now` (the scan keeps one trailing sample).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdCrossing {
    pub crossing_time: DateTime<Utc>,
    pub lead_minutes: i64,
}

// ---------------------------------------------------------------------------
// Request vocabulary
// ---------------------------------------------------------------------------

/// Unit system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    English,
    Metric,
}

impl Units {
    pub fn as_param(&self) -> &'static str {
        match self {
            Units::English => "english",
            Units::Metric => "metric",
        }
    }

    /// Short label for axis and tooltip text.
    pub fn label(&self) -> &'static str {
        match self {
            Units::English => "ft",
            Units::Metric => "m",
        }
    }
}

/// CO-OPS data product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    /// Harmonic tide predictions.
    Predictions,
    /// Verified or preliminary observed water level.
    WaterLevel,
}

impl Product {
    pub fn as_param(&self) -> &'static str {
        match self {
            Product::Predictions => "predictions",
            Product::WaterLevel => "water_level",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or decoding CO-OPS data.
///
/// Every variant is fatal to the single fetch that produced it; there is no
/// retry at this layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TideError {
    /// Non-2xx HTTP response from the provider.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// The request never produced a response (DNS, connect, timeout, body read).
    #[error("Transport error: {0}")]
    Transport(String),
    /// HTTP 200 whose body carried an `error.message` payload.
    #[error("Provider error: {0}")]
    Provider(String),
    /// The body was not the expected JSON shape.
    #[error("Parse error: {0}")]
    Parse(String),
}
