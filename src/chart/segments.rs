//! Threshold-based polyline segmentation and flood-zone rectangles.

use chrono::{DateTime, Utc};

use super::scale::{ChartSize, TimeScale};
use crate::forecast::interpolate_crossing;
use crate::model::Point;

/// A contiguous run of points entirely at/above or entirely below the
/// threshold. Adjacent segments share their boundary point.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub above: bool,
    pub points: Vec<Point>,
}

/// Highlight rectangle for one above-threshold run, in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRect {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

fn push_distinct(points: &mut Vec<Point>, p: Point) {
    if points.last() != Some(&p) {
        points.push(p);
    }
}

/// Splits time-ascending `points` into above/below runs.
///
/// Where consecutive points sit on opposite sides, an interpolated point at
/// exactly `threshold` closes one run and opens the next, so differently
/// colored segments meet without a gap. A value equal to the threshold
/// counts as above.
pub fn segment_by_threshold(points: &[Point], threshold: f64) -> Vec<Segment> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut segments = Vec::new();
    let mut current = Segment {
        above: first.v >= threshold,
        points: vec![*first],
    };

    for pair in points.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        let curr_above = curr.v >= threshold;

        if curr_above != current.above {
            let boundary = Point::new(interpolate_crossing(&prev, &curr, threshold), threshold);
            push_distinct(&mut current.points, boundary);
            let next = Segment {
                above: curr_above,
                points: vec![boundary],
            };
            segments.push(std::mem::replace(&mut current, next));
        }

        push_distinct(&mut current.points, curr);
    }

    segments.push(current);
    segments
}

/// Rectangles spanning the plot height for every above-threshold run of the
/// adjusted series.
///
/// A run still above threshold at the last sample is closed at the domain
/// end. Runs are clipped to the domain; runs entirely outside it are dropped.
pub fn flood_zones(adjusted: &[Point], threshold: f64, scale: &TimeScale, size: &ChartSize) -> Vec<ZoneRect> {
    let segments = segment_by_threshold(adjusted, threshold);
    let last_index = segments.len().saturating_sub(1);

    segments
        .iter()
        .enumerate()
        .filter(|(_, seg)| seg.above)
        .filter_map(|(i, seg)| {
            let run_start = seg.points.first()?.t;
            let run_end = if i == last_index {
                scale.end()
            } else {
                seg.points.last()?.t
            };

            if run_end < scale.start() || run_start > scale.end() {
                return None;
            }
            let start = scale.clamp(run_start);
            let end = scale.clamp(run_end);
            let x = scale.x_of(start);

            Some(ZoneRect {
                start,
                end,
                x,
                y: size.plot_top(),
                width: (scale.x_of(end) - x).max(0.0),
                height: size.plot_bottom() - size.plot_top(),
            })
        })
        .collect()
}
