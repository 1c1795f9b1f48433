/// Chart geometry and interaction.
///
/// Maps forecast output onto a 2D surface. Everything here is synchronous
/// and recomputed in full on each render; empty inputs draw nothing rather
/// than failing.
///
/// Submodules:
/// - `scale`:    time and value scales, plot size.
/// - `segments`: threshold-split polylines and flood-zone rectangles.
/// - `tooltip`:  nearest-sample lookup under the pointer.
/// - `render`:   render description, drawn to SVG with plotters.

pub mod render;
pub mod scale;
pub mod segments;
pub mod tooltip;

pub use render::{ChartError, ChartModel, ChartView, render_chart};
pub use scale::{ChartSize, TimeScale, ValueScale};
pub use segments::{Segment, ZoneRect, flood_zones, segment_by_threshold};
pub use tooltip::{ChartSeries, HoverRows, hover_rows};
