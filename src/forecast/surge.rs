//! Surge offset estimation and the adjusted forecast.
//!
//! The surge offset is the median of observed − predicted over the lookback
//! window. The median keeps a single sensor spike or a short data gap from
//! dragging the whole forecast.

use chrono::{DateTime, Duration, Utc};

use crate::ingest::{SeriesRequest, TideSource};
use crate::logging::{self, DataSource};
use crate::model::{Product, SurgeEstimate, TideError, TimeSeries, Units};

/// How the offset applied to future predictions is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurgeMode {
    /// Use the median computed from recent data.
    Auto,
    /// Use a user-entered offset in series units.
    Manual(f64),
}

/// Inputs to `build_adjusted_forecast`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub station: String,
    pub now: DateTime<Utc>,
    pub lookback_hours: i64,
    pub lookahead_hours: i64,
    pub interval_minutes: u32,
    pub datum: String,
    pub units: Units,
    pub surge_mode: SurgeMode,
}

/// Everything a caller needs to report and chart a forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedForecast {
    /// Future predictions shifted by `offset`.
    pub adjusted: TimeSeries,
    /// Offset actually applied (median or manual).
    pub offset: f64,
    /// Number of paired samples behind the median.
    pub n: usize,
    /// Median computed from the lookback window, even in manual mode.
    pub estimate: SurgeEstimate,
    /// Observations over the lookback window.
    pub observed: TimeSeries,
    /// Predictions over lookback and lookahead combined.
    pub predicted: TimeSeries,
}

/// Median of `observed[k] - predicted[k]` over every key present in both.
///
/// Returns `{ offset: 0.0, n: 0 }` when the series share no keys.
pub fn estimate_surge_offset(observed: &TimeSeries, predicted: &TimeSeries) -> SurgeEstimate {
    let mut diffs: Vec<f64> = observed
        .iter()
        .filter_map(|(k, obs)| predicted.get(k).map(|pred| obs - pred))
        .collect();

    if diffs.is_empty() {
        return SurgeEstimate { offset: 0.0, n: 0 };
    }

    diffs.sort_by(|a, b| a.total_cmp(b));
    let n = diffs.len();
    let mid = n / 2;
    let offset = if n % 2 == 0 {
        (diffs[mid - 1] + diffs[mid]) / 2.0
    } else {
        diffs[mid]
    };

    SurgeEstimate { offset, n }
}

/// Shifts every value by `offset`.
pub fn apply_offset(predicted: &TimeSeries, offset: f64) -> TimeSeries {
    predicted.iter().map(|(k, v)| (k.to_string(), v + offset)).collect()
}

/// Observed − predicted at every shared key; the "delta" chart series.
pub fn delta_series(observed: &TimeSeries, predicted: &TimeSeries) -> TimeSeries {
    observed
        .iter()
        .filter_map(|(k, obs)| predicted.get(k).map(|pred| (k.to_string(), obs - pred)))
        .collect()
}

fn series_request(req: &ForecastRequest, product: Product, begin: DateTime<Utc>, end: DateTime<Utc>) -> SeriesRequest {
    SeriesRequest {
        station: req.station.clone(),
        product,
        begin,
        end,
        interval_minutes: req.interval_minutes,
        datum: req.datum.clone(),
        units: req.units,
    }
}

/// Fetches recent observations and predictions, estimates the surge offset
/// and applies it to the upcoming predictions.
///
/// The two lookback fetches run concurrently; the lookahead fetch follows.
/// Any failed fetch fails the whole call.
pub fn build_adjusted_forecast<S: TideSource + ?Sized>(
    source: &S,
    req: &ForecastRequest,
) -> Result<AdjustedForecast, TideError> {
    let past_start = req.now - Duration::hours(req.lookback_hours);
    let future_end = req.now + Duration::hours(req.lookahead_hours);

    let observed_req = series_request(req, Product::WaterLevel, past_start, req.now);
    let predicted_past_req = series_request(req, Product::Predictions, past_start, req.now);

    let (observed, predicted_past) = std::thread::scope(|scope| {
        let observed = scope.spawn(|| source.fetch_series(&observed_req));
        let predicted = scope.spawn(|| source.fetch_series(&predicted_past_req));
        (join_fetch(observed), join_fetch(predicted))
    });
    let observed = observed?;
    let predicted_past = predicted_past?;

    let estimate = estimate_surge_offset(&observed, &predicted_past);

    let future_req = series_request(req, Product::Predictions, req.now, future_end);
    let predicted_future = source.fetch_series(&future_req)?;

    let offset = match req.surge_mode {
        SurgeMode::Auto => estimate.offset,
        SurgeMode::Manual(value) => value,
    };

    logging::info(
        DataSource::Forecast,
        Some(&req.station),
        &format!(
            "surge offset {:+.2} {} from {} paired samples ({:?})",
            offset,
            req.units.label(),
            estimate.n,
            req.surge_mode
        ),
    );
    if estimate.n == 0 {
        logging::warn(
            DataSource::Forecast,
            Some(&req.station),
            "no overlapping observed/predicted samples in lookback window",
        );
    }

    let adjusted = apply_offset(&predicted_future, offset);

    let mut predicted = predicted_past;
    predicted.extend_from(&predicted_future);

    Ok(AdjustedForecast {
        adjusted,
        offset,
        n: estimate.n,
        estimate,
        observed,
        predicted,
    })
}

fn join_fetch(
    handle: std::thread::ScopedJoinHandle<'_, Result<TimeSeries, TideError>>,
) -> Result<TimeSeries, TideError> {
    handle
        .join()
        .unwrap_or_else(|_| Err(TideError::Transport("fetch thread panicked".to_string())))
}
