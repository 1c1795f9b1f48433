/// Observation staleness detection.
///
/// CO-OPS water level stations report every 6 minutes. A forecast built on
/// an observation record that stopped hours ago still produces an offset,
/// but one that no longer describes the current surge. This module lets
/// callers flag that.
///
/// # Clock injection
/// All functions accept a `now: DateTime<Utc>` parameter rather than calling
/// `Utc::now()` internally, so tests stay deterministic.

use chrono::{DateTime, Utc};

use crate::model::{TimeSeries, parse_key};

/// Minutes between the newest sample in `series` and `now`.
///
/// Returns `None` for an empty series or one whose keys do not parse.
pub fn latest_observation_age_minutes(series: &TimeSeries, now: DateTime<Utc>) -> Option<i64> {
    let latest = series.keys().filter_map(parse_key).max()?;
    Some((now - latest).num_minutes())
}

/// Returns `true` if the newest sample is older than `max_age_minutes`.
///
/// Staleness is strictly greater than the threshold:
///   age > max_age_minutes  →  stale
///   age == max_age_minutes →  not stale
///
/// An empty series is stale.
pub fn is_stale_at(series: &TimeSeries, max_age_minutes: i64, now: DateTime<Utc>) -> bool {
    latest_observation_age_minutes(series, now)
        .map(|age| age > max_age_minutes)
        .unwrap_or(true)
}
