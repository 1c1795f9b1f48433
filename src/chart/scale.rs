//! Linear scales between data space and pixel space.

use chrono::{DateTime, Duration, Utc};

use crate::model::Point;

/// Fraction of the value span added above and below the data.
pub const VALUE_PAD_FRACTION: f64 = 0.1;

/// Pad used when every visible value (and the threshold) is identical.
const FLAT_PAD: f64 = 1.0;

/// Drawing surface size and margins, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSize {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
}

impl Default for ChartSize {
    fn default() -> Self {
        ChartSize {
            width: 800.0,
            height: 300.0,
            margin_top: 20.0,
            margin_right: 20.0,
            margin_bottom: 30.0,
            margin_left: 50.0,
        }
    }
}

impl ChartSize {
    pub fn plot_left(&self) -> f64 {
        self.margin_left
    }

    pub fn plot_right(&self) -> f64 {
        (self.width - self.margin_right).max(self.margin_left)
    }

    pub fn plot_top(&self) -> f64 {
        self.margin_top
    }

    pub fn plot_bottom(&self) -> f64 {
        (self.height - self.margin_bottom).max(self.margin_top)
    }
}

/// Maps `[start, end]` onto `[plot_left, plot_right]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    px_start: f64,
    px_end: f64,
}

impl TimeScale {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, size: &ChartSize) -> Self {
        TimeScale {
            start,
            end,
            px_start: size.plot_left(),
            px_end: size.plot_right(),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    // At least one millisecond so a zero-length domain never divides by zero
    fn span_ms(&self) -> f64 {
        ((self.end - self.start).num_milliseconds() as f64).max(1.0)
    }

    pub fn x_of(&self, t: DateTime<Utc>) -> f64 {
        let frac = (t - self.start).num_milliseconds() as f64 / self.span_ms();
        self.px_start + frac * (self.px_end - self.px_start)
    }

    pub fn invert(&self, px: f64) -> DateTime<Utc> {
        let width = self.px_end - self.px_start;
        if width == 0.0 {
            return self.start;
        }
        let frac = (px - self.px_start) / width;
        self.start + Duration::milliseconds((frac * self.span_ms()).round() as i64)
    }

    /// Clamps `t` into the domain.
    pub fn clamp(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        t.max(self.start).min(self.end)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }

    /// Whole-hour instants inside the domain, every `step_hours`.
    pub fn hour_ticks(&self, step_hours: i64) -> Vec<DateTime<Utc>> {
        let step = Duration::hours(step_hours.max(1));
        let step_secs = step.num_seconds();
        let first_secs = self.start.timestamp().div_euclid(step_secs) * step_secs;
        let mut tick = DateTime::<Utc>::from_timestamp(first_secs, 0).unwrap_or(self.start);
        if tick < self.start {
            tick += step;
        }

        let mut ticks = Vec::new();
        while tick <= self.end {
            ticks.push(tick);
            tick += step;
        }
        ticks
    }
}

/// Maps `[min, max]` (padded) onto `[plot_bottom, plot_top]`; larger values
/// land higher on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueScale {
    min: f64,
    max: f64,
    px_bottom: f64,
    px_top: f64,
}

impl ValueScale {
    /// Scale over an explicit domain, without padding.
    pub fn new(min: f64, max: f64, size: &ChartSize) -> Self {
        ValueScale {
            min,
            max,
            px_bottom: size.plot_bottom(),
            px_top: size.plot_top(),
        }
    }

    /// Padded scale covering every visible series plus the threshold, so the
    /// threshold line is always on screen.
    pub fn fit(series: &[&[Point]], threshold: f64, size: &ChartSize) -> Self {
        let (lo, hi) = series
            .iter()
            .flat_map(|points| points.iter())
            .map(|p| p.v)
            .filter(|v| v.is_finite())
            .fold((threshold, threshold), |(lo, hi), v| (lo.min(v), hi.max(v)));

        let pad = match (hi - lo) * VALUE_PAD_FRACTION {
            p if p > 0.0 => p,
            _ => FLAT_PAD,
        };

        Self::new(lo - pad, hi + pad, size)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn span(&self) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 { 1.0 } else { span }
    }

    pub fn y_of(&self, v: f64) -> f64 {
        let frac = (v - self.min) / self.span();
        self.px_bottom - frac * (self.px_bottom - self.px_top)
    }

    pub fn invert(&self, py: f64) -> f64 {
        let height = self.px_bottom - self.px_top;
        if height == 0.0 {
            return self.min;
        }
        self.min + (self.px_bottom - py) / height * self.span()
    }

    /// `count` evenly spaced values from `min` to `max` inclusive.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        match count {
            0 => Vec::new(),
            1 => vec![(self.min + self.max) / 2.0],
            _ => {
                let step = (self.max - self.min) / (count - 1) as f64;
                (0..count).map(|i| self.min + step * i as f64).collect()
            }
        }
    }
}
