/// Flood alerting built on top of the forecast.
///
/// Submodules:
/// - `thresholds`: current flood status from the adjusted series.

pub mod thresholds;

pub use thresholds::{FloodStatus, assess_flood_status};
