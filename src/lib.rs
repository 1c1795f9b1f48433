//! FloodCast: tide and storm-surge forecasting against NOAA CO-OPS data.
//!
//! Data flows one way:
//! - `ingest`   fetches observed and predicted water levels,
//! - `forecast` estimates the surge offset and the next flood crossing,
//! - `alert`    condenses that into a flood status,
//! - `chart`    lays the series out for drawing.
//!
//! `config` holds the persisted user settings, `stations` the known
//! station registry, `logging` the service logger.

pub mod alert;
pub mod chart;
pub mod config;
pub mod forecast;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod stations;
