//! Pointer inspection: nearest samples under the cursor.

use chrono::{DateTime, Utc};

use super::scale::TimeScale;
use crate::config::DisplayTimezone;
use crate::model::{Point, nearest_point, nearest_point_within_tolerance};

/// The series a chart draws, each time-ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub observed: Vec<Point>,
    pub predicted: Vec<Point>,
    pub adjusted: Vec<Point>,
    /// Present only when the delta display preference is on.
    pub delta: Option<Vec<Point>>,
}

/// Values shown in the tooltip for one pointer position.
///
/// `None` on observed or adjusted means "no data" near the pointer rather
/// than a stale value from further away.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverRows {
    pub pointer: DateTime<Utc>,
    pub observed: Option<Point>,
    pub predicted: Option<Point>,
    pub adjusted: Option<Point>,
    pub delta: Option<Point>,
    show_delta: bool,
}

pub fn hover_rows(series: &ChartSeries, pointer: DateTime<Utc>) -> HoverRows {
    HoverRows {
        pointer,
        observed: nearest_point_within_tolerance(&series.observed, pointer),
        predicted: nearest_point(&series.predicted, pointer),
        adjusted: nearest_point_within_tolerance(&series.adjusted, pointer),
        delta: series.delta.as_deref().and_then(|d| nearest_point(d, pointer)),
        show_delta: series.delta.is_some(),
    }
}

/// `hover_rows` for a pointer x in pixels, clamped into the time domain.
pub fn hover_at_x(series: &ChartSeries, scale: &TimeScale, px: f64) -> HoverRows {
    hover_rows(series, scale.clamp(scale.invert(px)))
}

impl HoverRows {
    /// Tooltip text, one line per row, header first.
    pub fn lines(&self, timezone: DisplayTimezone, unit_label: &str) -> Vec<String> {
        let value = |p: Option<Point>| match p {
            Some(p) => format!("{:.2} {}", p.v, unit_label),
            None => "no data".to_string(),
        };

        let mut lines = vec![
            timezone.format(self.pointer, "%b %d %H:%M"),
            format!("Observed: {}", value(self.observed)),
            format!("Predicted: {}", value(self.predicted)),
            format!("Adjusted: {}", value(self.adjusted)),
        ];
        if self.show_delta {
            let delta = match self.delta {
                Some(p) => format!("{:+.2} {}", p.v, unit_label),
                None => "no data".to_string(),
            };
            lines.push(format!("Delta: {}", delta));
        }
        lines
    }
}
