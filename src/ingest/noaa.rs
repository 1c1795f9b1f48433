/// NOAA CO-OPS Data API Client
///
/// Retrieves observed water levels and harmonic tide predictions from the
/// Center for Operational Oceanographic Products and Services "datagetter"
/// endpoint and normalizes them into `TimeSeries`.
///
/// API Documentation: https://api.tidesandcurrents.noaa.gov/api/prod/

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::logging::{self, DataSource};
use crate::model::{DEFAULT_INTERVAL_MINUTES, Product, TideError, TimeSeries, Units};

pub const DATAGETTER_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";

/// Date format CO-OPS expects for `begin_date` / `end_date`.
const REQUEST_DATE_FORMAT: &str = "%Y%m%d %H:%M";

// ============================================================================
// Requests
// ============================================================================

/// One product for one station over one window.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub station: String,
    pub product: Product,
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval_minutes: u32,
    pub datum: String,
    pub units: Units,
}

impl SeriesRequest {
    /// Request with the default 6-minute interval, MLLW datum and english units.
    pub fn new(station: &str, product: Product, begin: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        SeriesRequest {
            station: station.to_string(),
            product,
            begin,
            end,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            datum: "MLLW".to_string(),
            units: Units::English,
        }
    }
}

/// Builds the datagetter URL for a request against `base_url`.
///
/// Dates are rendered in UTC as `yyyymmdd HH:MM` with the space
/// percent-encoded.
pub fn build_datagetter_url_with_base(base_url: &str, req: &SeriesRequest) -> String {
    let begin = req.begin.format(REQUEST_DATE_FORMAT).to_string().replace(' ', "%20");
    let end = req.end.format(REQUEST_DATE_FORMAT).to_string().replace(' ', "%20");

    format!(
        "{}?product={}&begin_date={}&end_date={}&datum={}&station={}&interval={}&units={}&time_zone=gmt&format=json&application=floodcast",
        base_url,
        req.product.as_param(),
        begin,
        end,
        req.datum,
        req.station,
        req.interval_minutes,
        req.units.as_param(),
    )
}

/// Builds the datagetter URL for a request against the production endpoint.
pub fn build_datagetter_url(req: &SeriesRequest) -> String {
    build_datagetter_url_with_base(DATAGETTER_URL, req)
}

// ============================================================================
// Responses
// ============================================================================

/// Raw datagetter body. Predictions arrive under `predictions`, observations
/// under `data`, and provider-side failures under `error`.
#[derive(Debug, Deserialize)]
struct DatagetterResponse {
    predictions: Option<Vec<RawSample>>,
    data: Option<Vec<RawSample>>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct RawSample {
    t: String,
    // Usually a string like "3.012"; blank when the sensor had no reading
    #[serde(default)]
    v: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
}

/// Converts a provider timestamp ("2024-01-15 12:06") into a series key
/// ("2024-01-15T12:06Z").
///
/// This is a plain string transform valid only for the CO-OPS GMT format.
pub fn normalize_timestamp(provider_t: &str) -> String {
    format!("{}Z", provider_t.trim().replacen(' ', "T", 1))
}

fn parse_value(raw: &serde_json::Value) -> Option<f64> {
    let value = match raw {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        serde_json::Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Parses a datagetter JSON body into a `TimeSeries`.
///
/// Rows with a missing, blank or non-numeric value are dropped. A body with
/// neither `predictions` nor `data` yields an empty series.
pub fn parse_datagetter_response(body: &str) -> Result<TimeSeries, TideError> {
    let response: DatagetterResponse =
        serde_json::from_str(body).map_err(|e| TideError::Parse(e.to_string()))?;

    if let Some(err) = response.error {
        let message = err
            .message
            .unwrap_or_else(|| "provider reported an error without a message".to_string());
        return Err(TideError::Provider(message));
    }

    let rows = response.predictions.or(response.data).unwrap_or_default();

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let value = row.v.as_ref().and_then(parse_value)?;
            Some((normalize_timestamp(&row.t), value))
        })
        .collect())
}

// ============================================================================
// Client
// ============================================================================

/// Anything that can produce a `TimeSeries` for a request.
///
/// Forecasting depends on this rather than on HTTP so it can run against
/// canned data; `Sync` lets two fetches share one source across threads.
pub trait TideSource: Send + Sync {
    fn fetch_series(&self, req: &SeriesRequest) -> Result<TimeSeries, TideError>;
}

/// Blocking HTTP client for the CO-OPS datagetter.
pub struct NoaaClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl NoaaClient {
    pub fn new() -> Result<Self, TideError> {
        Self::with_base_url(DATAGETTER_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, TideError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TideError::Transport(e.to_string()))?;

        Ok(NoaaClient {
            http,
            base_url: base_url.to_string(),
        })
    }
}

impl TideSource for NoaaClient {
    /// Issues exactly one GET. No retry and no caching.
    fn fetch_series(&self, req: &SeriesRequest) -> Result<TimeSeries, TideError> {
        let url = build_datagetter_url_with_base(&self.base_url, req);
        logging::debug(DataSource::Noaa, Some(&req.station), &format!("GET {}", url));

        let result = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| TideError::Transport(e.to_string()))
            .and_then(|response| {
                let status = response.status();
                if !status.is_success() {
                    return Err(TideError::Http(status.as_u16()));
                }
                response.text().map_err(|e| TideError::Transport(e.to_string()))
            })
            .and_then(|body| parse_datagetter_response(&body));

        match &result {
            Ok(series) => logging::debug(
                DataSource::Noaa,
                Some(&req.station),
                &format!("{}: {} samples", req.product, series.len()),
            ),
            Err(e) => logging::log_noaa_failure(&req.station, &format!("fetch {}", req.product), e),
        }

        result
    }
}

// ============================================================================
// Tests
// ============================================================================
