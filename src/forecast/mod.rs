/// Surge forecasting engine.
///
/// Pure transforms over `TimeSeries` and `Point` slices, plus the one
/// function that orchestrates fetches through a `TideSource`.
///
/// Submodules:
/// - `surge`:     median surge offset, adjusted forecast, delta series.
/// - `crossing`:  interpolated upward threshold crossings.
/// - `freshness`: staleness of the observation record.

pub mod crossing;
pub mod freshness;
pub mod surge;

pub use crossing::{find_next_threshold_crossing, interpolate_crossing};
pub use surge::{
    AdjustedForecast, ForecastRequest, SurgeMode, apply_offset, build_adjusted_forecast,
    delta_series, estimate_surge_offset,
};
