//! Render description for a tide chart.
//!
//! `render_chart` is a pure function of the model: it computes scales and
//! pixel geometry once, and `ChartView::to_svg` draws the result through the
//! plotters SVG backend. Nothing is cached between renders.

use chrono::{DateTime, Utc};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use thiserror::Error;

use super::scale::{ChartSize, TimeScale, ValueScale};
use super::segments::{ZoneRect, flood_zones, segment_by_threshold};
use super::tooltip::{ChartSeries, hover_at_x};
use crate::config::{DisplayTimezone, Theme};
use crate::model::Point;

const VALUE_TICK_COUNT: usize = 5;
const TIME_TICK_HOURS: i64 = 6;
const FONT_FAMILY: &str = "sans-serif";
const FONT_SIZE: i32 = 11;
const TOOLTIP_LINE_HEIGHT: f64 = 13.0;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart drawing failed: {0}")]
    Draw(String),
}

/// Everything one render depends on.
#[derive(Debug, Clone)]
pub struct ChartModel<'a> {
    pub series: &'a ChartSeries,
    pub threshold: f64,
    pub domain_start: DateTime<Utc>,
    pub domain_end: DateTime<Utc>,
    pub now: Option<DateTime<Utc>>,
    pub size: ChartSize,
    /// Pointer x in pixels, when hovering.
    pub pointer_x: Option<f64>,
    pub theme: Theme,
    pub timezone: DisplayTimezone,
    pub unit_label: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: RGBColor,
    pub text: RGBColor,
    pub grid: RGBColor,
    pub observed: RGBColor,
    pub predicted: RGBColor,
    pub adjusted_below: RGBColor,
    pub adjusted_above: RGBColor,
    pub delta: RGBColor,
    pub threshold: RGBColor,
    pub zone: RGBColor,
    pub zone_opacity: f64,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                background: RGBColor(255, 255, 255),
                text: RGBColor(51, 51, 51),
                grid: RGBColor(229, 229, 229),
                observed: RGBColor(31, 119, 180),
                predicted: RGBColor(158, 158, 158),
                adjusted_below: RGBColor(44, 160, 44),
                adjusted_above: RGBColor(214, 39, 40),
                delta: RGBColor(148, 103, 189),
                threshold: RGBColor(214, 39, 40),
                zone: RGBColor(214, 39, 40),
                zone_opacity: 0.12,
            },
            Theme::Dark => Palette {
                background: RGBColor(18, 18, 18),
                text: RGBColor(224, 224, 224),
                grid: RGBColor(44, 44, 44),
                observed: RGBColor(100, 181, 246),
                predicted: RGBColor(117, 117, 117),
                adjusted_below: RGBColor(129, 199, 132),
                adjusted_above: RGBColor(239, 83, 80),
                delta: RGBColor(206, 147, 216),
                threshold: RGBColor(239, 83, 80),
                zone: RGBColor(239, 83, 80),
                zone_opacity: 0.18,
            },
        }
    }
}

/// One stroked polyline, in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PathView {
    pub points: Vec<(i32, i32)>,
    pub color: RGBColor,
    pub stroke_width: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipView {
    pub x: f64,
    pub lines: Vec<String>,
}

/// Geometry ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub size: ChartSize,
    pub palette: Palette,
    pub x: TimeScale,
    pub y: ValueScale,
    pub paths: Vec<PathView>,
    pub threshold_y: f64,
    pub zones: Vec<ZoneRect>,
    pub now_x: Option<f64>,
    pub value_ticks: Vec<(f64, String)>,
    pub time_ticks: Vec<(f64, String)>,
    pub tooltip: Option<TooltipView>,
}

fn visible(points: &[Point], scale: &TimeScale) -> Vec<Point> {
    points.iter().copied().filter(|p| scale.contains(p.t)).collect()
}

fn px(v: f64) -> i32 {
    v.round() as i32
}

/// Pixel polyline for `points`; empty for fewer than two points.
pub fn pixel_path(points: &[Point], x: &TimeScale, y: &ValueScale) -> Vec<(i32, i32)> {
    if points.len() < 2 {
        return Vec::new();
    }
    points.iter().map(|p| (px(x.x_of(p.t)), px(y.y_of(p.v)))).collect()
}

pub fn render_chart(model: &ChartModel<'_>) -> ChartView {
    let size = model.size;
    let palette = Palette::for_theme(model.theme);
    let x = TimeScale::new(model.domain_start, model.domain_end, &size);

    let observed = visible(&model.series.observed, &x);
    let predicted = visible(&model.series.predicted, &x);
    let adjusted = visible(&model.series.adjusted, &x);
    let delta = model.series.delta.as_deref().map(|d| visible(d, &x));

    let mut fitted: Vec<&[Point]> = vec![observed.as_slice(), predicted.as_slice(), adjusted.as_slice()];
    if let Some(d) = delta.as_deref() {
        fitted.push(d);
    }
    let y = ValueScale::fit(&fitted, model.threshold, &size);

    let mut paths = vec![
        PathView {
            points: pixel_path(&predicted, &x, &y),
            color: palette.predicted,
            stroke_width: 1,
        },
        PathView {
            points: pixel_path(&observed, &x, &y),
            color: palette.observed,
            stroke_width: 2,
        },
    ];
    for segment in segment_by_threshold(&adjusted, model.threshold) {
        paths.push(PathView {
            points: pixel_path(&segment.points, &x, &y),
            color: if segment.above {
                palette.adjusted_above
            } else {
                palette.adjusted_below
            },
            stroke_width: 2,
        });
    }
    if let Some(d) = delta.as_deref() {
        paths.push(PathView {
            points: pixel_path(d, &x, &y),
            color: palette.delta,
            stroke_width: 1,
        });
    }
    paths.retain(|p| !p.points.is_empty());

    let zones = flood_zones(&model.series.adjusted, model.threshold, &x, &size);
    let now_x = model.now.filter(|t| x.contains(*t)).map(|t| x.x_of(t));

    let value_ticks = y
        .ticks(VALUE_TICK_COUNT)
        .into_iter()
        .map(|v| (y.y_of(v), format!("{:.1}", v)))
        .collect();
    let time_ticks = x
        .hour_ticks(TIME_TICK_HOURS)
        .into_iter()
        .map(|t| (x.x_of(t), model.timezone.format(t, "%d %H:%M")))
        .collect();

    let tooltip = model.pointer_x.map(|pointer| {
        let rows = hover_at_x(model.series, &x, pointer);
        TooltipView {
            x: x.x_of(rows.pointer),
            lines: rows.lines(model.timezone, model.unit_label),
        }
    });

    ChartView {
        size,
        palette,
        threshold_y: y.y_of(model.threshold),
        x,
        y,
        paths,
        zones,
        now_x,
        value_ticks,
        time_ticks,
        tooltip,
    }
}

impl ChartView {
    /// Draws the view as a standalone SVG document.
    pub fn to_svg(&self) -> Result<String, ChartError> {
        let mut svg = String::new();
        self.draw_svg(&mut svg).map_err(|e| ChartError::Draw(e.to_string()))?;
        Ok(svg)
    }

    fn draw_svg<'a>(&self, svg: &'a mut String) -> DrawResult<(), SVGBackend<'a>> {
        let s = &self.size;
        let p = &self.palette;
        let dims = (s.width.max(1.0).round() as u32, s.height.max(1.0).round() as u32);
        let root = SVGBackend::with_string(svg, dims).into_drawing_area();
        root.fill(&p.background)?;

        let (left, right) = (px(s.plot_left()), px(s.plot_right()));
        let (top, bottom) = (px(s.plot_top()), px(s.plot_bottom()));

        for zone in &self.zones {
            root.draw(&Rectangle::new(
                [
                    (px(zone.x), px(zone.y)),
                    (px(zone.x + zone.width), px(zone.y + zone.height)),
                ],
                p.zone.mix(p.zone_opacity).filled(),
            ))?;
        }

        let font = (FONT_FAMILY, FONT_SIZE).into_font().color(&p.text);
        let value_label = font.pos(Pos::new(HPos::Right, VPos::Center));
        for (py, label) in &self.value_ticks {
            let y = px(*py);
            root.draw(&PathElement::new(vec![(left, y), (right, y)], p.grid.stroke_width(1)))?;
            root.draw(&Text::new(label.as_str(), (left - 4, y), value_label.clone()))?;
        }
        let time_label = font.pos(Pos::new(HPos::Center, VPos::Top));
        for (tx, label) in &self.time_ticks {
            root.draw(&Text::new(label.as_str(), (px(*tx), bottom + 6), time_label.clone()))?;
        }

        let threshold_y = px(self.threshold_y);
        root.draw(&PathElement::new(
            vec![(left, threshold_y), (right, threshold_y)],
            p.threshold.stroke_width(1),
        ))?;

        for path in &self.paths {
            root.draw(&PathElement::new(
                path.points.clone(),
                path.color.stroke_width(path.stroke_width),
            ))?;
        }

        if let Some(nx) = self.now_x {
            let x = px(nx);
            root.draw(&PathElement::new(vec![(x, top), (x, bottom)], p.text.stroke_width(1)))?;
        }

        if let Some(tip) = &self.tooltip {
            let x = px(tip.x);
            root.draw(&PathElement::new(vec![(x, top), (x, bottom)], p.grid.stroke_width(1)))?;
            for (i, line) in tip.lines.iter().enumerate() {
                let y = s.plot_top() + 12.0 + TOOLTIP_LINE_HEIGHT * i as f64;
                root.draw(&Text::new(line.as_str(), (x + 6, px(y)), font.clone()))?;
            }
        }

        root.present()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn at(minutes: i64, v: f64) -> Point {
        Point::new(t0() + Duration::minutes(minutes), v)
    }

    fn model<'a>(series: &'a ChartSeries) -> ChartModel<'a> {
        ChartModel {
            series,
            threshold: 4.2,
            domain_start: t0(),
            domain_end: t0() + Duration::hours(2),
            now: Some(t0() + Duration::minutes(6)),
            size: ChartSize::default(),
            pointer_x: None,
            theme: Theme::Light,
            timezone: DisplayTimezone::Utc,
            unit_label: "ft",
        }
    }

    fn sample_series() -> ChartSeries {
        ChartSeries {
            observed: vec![at(0, 3.0), at(6, 3.2)],
            predicted: vec![at(0, 2.5), at(6, 2.7), at(12, 3.7), at(18, 4.0)],
            adjusted: vec![at(6, 3.2), at(12, 4.2), at(18, 4.5)],
            delta: None,
        }
    }

    #[test]
    fn test_pixel_path_uses_scales() {
        let size = ChartSize::default();
        let x = TimeScale::new(t0(), t0() + Duration::minutes(6), &size);
        let y = ValueScale::new(0.0, 10.0, &size);
        let points = pixel_path(&[at(0, 0.0), at(6, 10.0)], &x, &y);
        assert_eq!(points, vec![(50, 270), (780, 20)]);
        assert!(pixel_path(&[at(0, 1.0)], &x, &y).is_empty());
    }

    #[test]
    fn test_render_splits_adjusted_and_draws_zone() {
        let series = sample_series();
        let view = render_chart(&model(&series));

        // predicted + observed + adjusted below + adjusted above
        assert_eq!(view.paths.len(), 4);
        assert!(view.paths.iter().any(|p| p.color == view.palette.adjusted_above));
        assert!(view.paths.iter().any(|p| p.color == view.palette.adjusted_below));
        assert_eq!(view.zones.len(), 1);
        assert_eq!(view.zones[0].end, t0() + Duration::hours(2));
        assert!(view.now_x.is_some());
        assert!(view.tooltip.is_none());
    }

    #[test]
    fn test_threshold_line_is_inside_plot() {
        let series = sample_series();
        let mut m = model(&series);
        m.threshold = 20.0;
        let view = render_chart(&m);
        let size = ChartSize::default();
        assert!(view.threshold_y >= size.plot_top() && view.threshold_y <= size.plot_bottom());
    }

    #[test]
    fn test_tooltip_follows_pointer() {
        let series = sample_series();
        let mut m = model(&series);
        let size = ChartSize::default();
        let x = TimeScale::new(m.domain_start, m.domain_end, &size);
        m.pointer_x = Some(x.x_of(t0() + Duration::minutes(6)));

        let view = render_chart(&m);
        let tip = view.tooltip.expect("pointer should produce a tooltip");
        assert_eq!(tip.lines[1], "Observed: 3.20 ft");
        assert_eq!(tip.lines[3], "Adjusted: 3.20 ft");
    }

    #[test]
    fn test_empty_series_render_nothing_but_frame() {
        let series = ChartSeries::default();
        let view = render_chart(&model(&series));
        assert!(view.paths.is_empty());
        assert!(view.zones.is_empty());

        let svg = view.to_svg().expect("empty chart should still draw");
        assert!(svg.contains("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        // Grid lines, threshold and the now marker only.
        assert_eq!(svg.matches("<polyline").count(), VALUE_TICK_COUNT + 2);
        assert_eq!(svg.matches("<rect").count(), 1, "background only");
    }

    #[test]
    fn test_svg_draws_zone_threshold_and_every_path() {
        let mut series = sample_series();
        series.delta = Some(vec![at(0, 0.5), at(6, 0.5)]);
        let mut m = model(&series);
        m.theme = Theme::Dark;
        let view = render_chart(&m);
        assert_eq!(view.paths.len(), 5);

        let svg = view.to_svg().expect("chart should draw");
        assert!(svg.contains("#121212"), "dark theme background expected");
        assert_eq!(svg.matches("<rect").count(), 1 + view.zones.len());
        assert_eq!(
            svg.matches("<polyline").count(),
            view.paths.len() + VALUE_TICK_COUNT + 2,
            "series, grid, threshold and now lines"
        );
    }

    #[test]
    fn test_svg_tooltip_text_is_drawn() {
        let series = sample_series();
        let mut m = model(&series);
        let x = TimeScale::new(m.domain_start, m.domain_end, &m.size);
        m.pointer_x = Some(x.x_of(t0() + Duration::minutes(6)));

        let svg = render_chart(&m).to_svg().expect("chart should draw");
        assert!(svg.contains("Observed: 3.20 ft"), "tooltip missing from {}", svg);
        assert!(svg.contains("Predicted: 2.70 ft"));
    }
}
