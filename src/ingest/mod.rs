/// Data acquisition from external tide services.
///
/// Submodules:
/// - `noaa`: NOAA CO-OPS datagetter client and response normalization.

pub mod noaa;

pub use noaa::{NoaaClient, SeriesRequest, TideSource};
