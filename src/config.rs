//! Application configuration.
//!
//! `AppConfiguration` is loaded once at startup through a `SettingsStore`
//! and passed by reference to whatever needs it. Nothing reads settings
//! from ambient global state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::forecast::{ForecastRequest, SurgeMode};
use crate::logging::{self, DataSource};
use crate::model::{DEFAULT_INTERVAL_MINUTES, Units};
use crate::stations;

pub const ENV_STATION: &str = "FLOODCAST_STATION";
pub const ENV_THRESHOLD: &str = "FLOODCAST_THRESHOLD";

/// Longest lookback, lookahead or absolute span accepted, in hours.
pub const MAX_RANGE_HOURS: i64 = 366 * 24;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Settings values
// ---------------------------------------------------------------------------

/// Whether the surge offset is computed or entered by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetMode {
    #[default]
    Auto,
    Manual,
}

/// Timezone used when printing times to the user. Data stays UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayTimezone {
    #[default]
    Utc,
    Local,
}

impl DisplayTimezone {
    pub fn format(&self, t: DateTime<Utc>, fmt: &str) -> String {
        match self {
            DisplayTimezone::Utc => format!("{} UTC", t.format(fmt)),
            DisplayTimezone::Local => t.with_timezone(&chrono::Local).format(fmt).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Window shown on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TimeRange {
    /// Slides with the clock.
    Relative { lookback_hours: i64, lookahead_hours: i64 },
    /// Fixed instants.
    Absolute { start: DateTime<Utc>, end: DateTime<Utc> },
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Relative {
            lookback_hours: 24,
            lookahead_hours: 48,
        }
    }
}

impl TimeRange {
    /// Chart domain for this range at `now`.
    pub fn window(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), ConfigError> {
        match *self {
            TimeRange::Relative {
                lookback_hours,
                lookahead_hours,
            } => {
                let out_of_range = || {
                    ConfigError::Invalid(format!(
                        "time range of {}h back / {}h ahead does not fit around {}",
                        lookback_hours, lookahead_hours, now
                    ))
                };
                let start = Duration::try_hours(lookback_hours)
                    .and_then(|d| now.checked_sub_signed(d))
                    .ok_or_else(out_of_range)?;
                let end = Duration::try_hours(lookahead_hours)
                    .and_then(|d| now.checked_add_signed(d))
                    .ok_or_else(out_of_range)?;
                Ok((start, end))
            }
            TimeRange::Absolute { start, end } => Ok((start, end)),
        }
    }

    /// Lookback and lookahead, in whole hours of at least one, that cover
    /// the window from `now`.
    pub fn forecast_hours(&self, now: DateTime<Utc>) -> Result<(i64, i64), ConfigError> {
        let (start, end) = self.window(now)?;
        let ceil_hours = |d: Duration| (d.num_minutes() + 59).div_euclid(60).max(1);
        Ok((ceil_hours(now - start), ceil_hours(end - now)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            TimeRange::Relative {
                lookback_hours,
                lookahead_hours,
            } if lookback_hours <= 0 || lookahead_hours <= 0 => Err(ConfigError::Invalid(
                "relative time range needs positive lookback and lookahead".to_string(),
            )),
            TimeRange::Relative {
                lookback_hours,
                lookahead_hours,
            } if lookback_hours > MAX_RANGE_HOURS || lookahead_hours > MAX_RANGE_HOURS => {
                Err(ConfigError::Invalid(format!(
                    "relative time range is limited to {} hours each way",
                    MAX_RANGE_HOURS
                )))
            }
            TimeRange::Absolute { start, end } if end <= start => Err(ConfigError::Invalid(
                "absolute time range must end after it starts".to_string(),
            )),
            TimeRange::Absolute { start, end } if (end - start).num_hours() > MAX_RANGE_HOURS => {
                Err(ConfigError::Invalid(format!(
                    "absolute time range is limited to {} hours",
                    MAX_RANGE_HOURS
                )))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayPrefs {
    pub timezone: DisplayTimezone,
    pub show_delta: bool,
    pub theme: Theme,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Session settings, persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfiguration {
    /// CO-OPS station id.
    pub station: String,
    pub datum: String,
    pub units: Units,
    pub interval_minutes: u32,
    /// Flood threshold in series units (feet for english units).
    pub flood_threshold: f64,
    pub surge_mode: OffsetMode,
    /// Offset used when `surge_mode` is manual.
    pub manual_offset: f64,
    pub time_range: TimeRange,
    pub display: DisplayPrefs,
}

impl Default for AppConfiguration {
    fn default() -> Self {
        AppConfiguration {
            station: "8518750".to_string(),
            datum: "MLLW".to_string(),
            units: Units::English,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            flood_threshold: 7.0,
            surge_mode: OffsetMode::Auto,
            manual_offset: 0.0,
            time_range: TimeRange::default(),
            display: DisplayPrefs::default(),
        }
    }
}

impl AppConfiguration {
    /// Loads persisted settings, falling back to defaults when nothing is
    /// stored or the stored copy is unreadable.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let parsed = store.load().and_then(|text| match text {
            Some(text) => {
                let config: AppConfiguration = toml::from_str(&text)?;
                config.validate()?;
                Ok(Some(config))
            }
            None => Ok(None),
        });

        match parsed {
            Ok(Some(config)) => config,
            Ok(None) => {
                logging::debug(DataSource::Config, None, "no saved settings, using defaults");
                AppConfiguration::default()
            }
            Err(e) => {
                logging::warn(
                    DataSource::Config,
                    None,
                    &format!("ignoring saved settings: {}", e),
                );
                AppConfiguration::default()
            }
        }
    }

    /// Overwrites the stored settings with `self`.
    pub fn save(&self, store: &dyn SettingsStore) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        store.save(&text)
    }

    /// Applies `FLOODCAST_STATION` / `FLOODCAST_THRESHOLD` from the process
    /// environment. Call after `dotenv` so a `.env` file is honored.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Same as `apply_env_overrides` with an injected lookup.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(station) = lookup(ENV_STATION) {
            self.set_station(station.trim())?;
        }
        if let Some(raw) = lookup(ENV_THRESHOLD) {
            let threshold = raw.trim().parse::<f64>().map_err(|_| {
                ConfigError::Invalid(format!("{} is not a number: '{}'", ENV_THRESHOLD, raw))
            })?;
            self.set_flood_threshold(threshold)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !stations::is_valid_station_id(&self.station) {
            return Err(ConfigError::Invalid(format!(
                "station id must be 7 digits, got '{}'",
                self.station
            )));
        }
        if !self.flood_threshold.is_finite() {
            return Err(ConfigError::Invalid("flood threshold must be finite".to_string()));
        }
        if !self.manual_offset.is_finite() {
            return Err(ConfigError::Invalid("manual offset must be finite".to_string()));
        }
        if self.interval_minutes == 0 {
            return Err(ConfigError::Invalid("interval must be at least one minute".to_string()));
        }
        self.time_range.validate()
    }

    // --- User actions -------------------------------------------------------

    /// Switches station. Also adopts the registry's suggested threshold,
    /// converted to the configured units, and datum when the station is known.
    pub fn set_station(&mut self, id: &str) -> Result<(), ConfigError> {
        if !stations::is_valid_station_id(id) {
            return Err(ConfigError::Invalid(format!("station id must be 7 digits, got '{}'", id)));
        }
        self.station = id.to_string();
        if let Some(known) = stations::find_station(id) {
            self.flood_threshold = known.flood_threshold_in(self.units);
            self.datum = known.datum.to_string();
        }
        Ok(())
    }

    pub fn set_flood_threshold(&mut self, threshold: f64) -> Result<(), ConfigError> {
        if !threshold.is_finite() {
            return Err(ConfigError::Invalid("flood threshold must be finite".to_string()));
        }
        self.flood_threshold = threshold;
        Ok(())
    }

    /// `Some(offset)` switches to manual mode, `None` back to auto.
    pub fn set_manual_offset(&mut self, offset: Option<f64>) -> Result<(), ConfigError> {
        match offset {
            Some(value) if !value.is_finite() => {
                Err(ConfigError::Invalid("manual offset must be finite".to_string()))
            }
            Some(value) => {
                self.surge_mode = OffsetMode::Manual;
                self.manual_offset = value;
                Ok(())
            }
            None => {
                self.surge_mode = OffsetMode::Auto;
                Ok(())
            }
        }
    }

    pub fn set_time_range(&mut self, range: TimeRange) -> Result<(), ConfigError> {
        range.validate()?;
        self.time_range = range;
        Ok(())
    }

    // --- Derived values -----------------------------------------------------

    pub fn surge_mode(&self) -> SurgeMode {
        match self.surge_mode {
            OffsetMode::Auto => SurgeMode::Auto,
            OffsetMode::Manual => SurgeMode::Manual(self.manual_offset),
        }
    }

    pub fn forecast_request(&self, now: DateTime<Utc>) -> Result<ForecastRequest, ConfigError> {
        let (lookback_hours, lookahead_hours) = self.time_range.forecast_hours(now)?;
        Ok(ForecastRequest {
            station: self.station.clone(),
            now,
            lookback_hours,
            lookahead_hours,
            interval_minutes: self.interval_minutes,
            datum: self.datum.clone(),
            units: self.units,
            surge_mode: self.surge_mode(),
        })
    }
}

// ---------------------------------------------------------------------------
// Storage ports
// ---------------------------------------------------------------------------

/// Where settings text lives between runs.
pub trait SettingsStore {
    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<String>, ConfigError>;
    fn save(&self, contents: &str) -> Result<(), ConfigError>;
}

/// Settings kept in a TOML file on disk.
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TomlFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlFileStore {
    fn load(&self) -> Result<Option<String>, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, contents: &str) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// In-process store, for tests and one-shot runs.
#[derive(Default)]
pub struct MemoryStore {
    contents: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn with_contents(contents: &str) -> Self {
        MemoryStore {
            contents: Mutex::new(Some(contents.to_string())),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, ConfigError> {
        self.contents
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| ConfigError::Invalid("settings store lock poisoned".to_string()))
    }

    fn save(&self, contents: &str) -> Result<(), ConfigError> {
        let mut guard = self
            .contents
            .lock()
            .map_err(|_| ConfigError::Invalid("settings store lock poisoned".to_string()))?;
        *guard = Some(contents.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_store_yields_defaults() {
        let store = MemoryStore::default();
        assert_eq!(AppConfiguration::load(&store), AppConfiguration::default());
    }

    #[test]
    fn test_save_then_load_preserves_every_setting() {
        let store = MemoryStore::default();
        let mut config = AppConfiguration::default();
        config.set_station("8443970").unwrap();
        config.set_manual_offset(Some(0.8)).unwrap();
        config
            .set_time_range(TimeRange::Absolute {
                start: fixed_now(),
                end: fixed_now() + Duration::hours(6),
            })
            .unwrap();
        config.display = DisplayPrefs {
            timezone: DisplayTimezone::Local,
            show_delta: true,
            theme: Theme::Dark,
        };
        config.units = Units::Metric;

        config.save(&store).expect("save should succeed");
        assert_eq!(AppConfiguration::load(&store), config);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let store = MemoryStore::with_contents(
            r#"
station = "8724580"
flood_threshold = 2.6

[display]
show_delta = true
"#,
        );
        let config = AppConfiguration::load(&store);
        assert_eq!(config.station, "8724580");
        assert_eq!(config.flood_threshold, 2.6);
        assert!(config.display.show_delta);
        assert_eq!(config.display.theme, Theme::Light);
        assert_eq!(config.time_range, TimeRange::default());
    }

    #[test]
    fn test_relative_range_in_toml() {
        let store = MemoryStore::with_contents(
            r#"
[time_range]
mode = "relative"
lookback_hours = 12
lookahead_hours = 6
"#,
        );
        let config = AppConfiguration::load(&store);
        assert_eq!(
            config.time_range,
            TimeRange::Relative {
                lookback_hours: 12,
                lookahead_hours: 6
            }
        );
    }

    #[test]
    fn test_corrupt_or_invalid_file_falls_back_to_defaults() {
        let garbage = MemoryStore::with_contents("station = [not toml");
        assert_eq!(AppConfiguration::load(&garbage), AppConfiguration::default());

        let bad_station = MemoryStore::with_contents("station = \"abc\"");
        assert_eq!(AppConfiguration::load(&bad_station), AppConfiguration::default());
    }

    #[test]
    fn test_set_station_adopts_registry_threshold() {
        let mut config = AppConfiguration::default();
        config.set_station("8724580").unwrap();
        assert_eq!(config.flood_threshold, 2.6);

        // Unknown but well-formed ids keep the current threshold.
        config.set_station("1234567").unwrap();
        assert_eq!(config.flood_threshold, 2.6);

        assert!(config.set_station("12").is_err());
        assert_eq!(config.station, "1234567");
    }

    #[test]
    fn test_set_station_converts_registry_threshold_for_metric_units() {
        let mut config = AppConfiguration::default();
        config.units = Units::Metric;
        config.set_station("8443970").unwrap();
        assert!(
            (config.flood_threshold - 3.81).abs() < 1e-9,
            "Boston's 12.5 ft threshold should be stored as metres, got {}",
            config.flood_threshold
        );
    }

    #[test]
    fn test_setters_reject_invalid_values() {
        let mut config = AppConfiguration::default();
        assert!(config.set_flood_threshold(f64::NAN).is_err());
        assert!(config.set_manual_offset(Some(f64::INFINITY)).is_err());
        assert!(
            config
                .set_time_range(TimeRange::Absolute {
                    start: fixed_now(),
                    end: fixed_now(),
                })
                .is_err()
        );
        assert!(
            config
                .set_time_range(TimeRange::Relative {
                    lookback_hours: 0,
                    lookahead_hours: 6,
                })
                .is_err()
        );
        assert!(
            config
                .set_time_range(TimeRange::Relative {
                    lookback_hours: 3_000_000_000,
                    lookahead_hours: 1,
                })
                .is_err()
        );
        assert!(
            config
                .set_time_range(TimeRange::Absolute {
                    start: fixed_now(),
                    end: fixed_now() + Duration::hours(MAX_RANGE_HOURS + 1),
                })
                .is_err()
        );
        assert_eq!(config, AppConfiguration::default());
    }

    #[test]
    fn test_surge_mode_follows_manual_toggle() {
        let mut config = AppConfiguration::default();
        assert_eq!(config.surge_mode(), SurgeMode::Auto);
        config.set_manual_offset(Some(1.25)).unwrap();
        assert_eq!(config.surge_mode(), SurgeMode::Manual(1.25));
        config.set_manual_offset(None).unwrap();
        assert_eq!(config.surge_mode(), SurgeMode::Auto);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let mut config = AppConfiguration::default();
        config
            .apply_overrides_from(|key| match key {
                ENV_STATION => Some("9414290".to_string()),
                ENV_THRESHOLD => Some(" 8.1 ".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.station, "9414290");
        assert_eq!(config.flood_threshold, 8.1);

        let err = config.apply_overrides_from(|key| (key == ENV_THRESHOLD).then(|| "high".to_string()));
        assert!(err.is_err());
    }

    #[test]
    fn test_window_and_forecast_hours() {
        let relative = TimeRange::default();
        assert_eq!(
            relative.window(fixed_now()).unwrap(),
            (fixed_now() - Duration::hours(24), fixed_now() + Duration::hours(48))
        );
        assert_eq!(relative.forecast_hours(fixed_now()).unwrap(), (24, 48));

        let absolute = TimeRange::Absolute {
            start: fixed_now() - Duration::minutes(90),
            end: fixed_now() + Duration::minutes(30),
        };
        assert_eq!(absolute.forecast_hours(fixed_now()).unwrap(), (2, 1));

        // A window wholly in the past still asks for at least an hour ahead.
        let past = TimeRange::Absolute {
            start: fixed_now() - Duration::hours(10),
            end: fixed_now() - Duration::hours(5),
        };
        assert_eq!(past.forecast_hours(fixed_now()).unwrap(), (10, 1));
    }

    #[test]
    fn test_oversized_range_in_file_is_rejected_not_panicking() {
        let store = MemoryStore::with_contents(
            r#"
[time_range]
mode = "relative"
lookback_hours = 3000000000
lookahead_hours = 1
"#,
        );
        let config = AppConfiguration::load(&store);
        assert_eq!(config.time_range, TimeRange::default());
        assert!(config.forecast_request(fixed_now()).is_ok());

        // A range built around validation still fails cleanly at use.
        let huge = TimeRange::Relative {
            lookback_hours: i64::MAX,
            lookahead_hours: 1,
        };
        assert!(huge.window(fixed_now()).is_err());
        assert!(huge.forecast_hours(fixed_now()).is_err());
    }

    #[test]
    fn test_forecast_request_carries_settings() {
        let config = AppConfiguration::default();
        let req = config.forecast_request(fixed_now()).unwrap();
        assert_eq!(req.station, "8518750");
        assert_eq!(req.lookback_hours, 24);
        assert_eq!(req.lookahead_hours, 48);
        assert_eq!(req.interval_minutes, 6);
        assert_eq!(req.surge_mode, SurgeMode::Auto);
    }

    #[test]
    fn test_display_timezone_utc_format() {
        assert_eq!(
            DisplayTimezone::Utc.format(fixed_now(), "%b %d %H:%M"),
            "Jan 15 12:00 UTC"
        );
    }

    #[test]
    fn test_toml_file_store_missing_file_then_round_trip() {
        let dir = std::env::temp_dir().join(format!("floodcast-config-{}", std::process::id()));
        let store = TomlFileStore::new(dir.join("nested").join("floodcast.toml"));
        assert_eq!(store.load().unwrap(), None, "missing file reads as nothing saved");

        let mut config = AppConfiguration::default();
        config.set_flood_threshold(5.25).unwrap();
        config.save(&store).unwrap();
        assert_eq!(AppConfiguration::load(&store), config);

        fs::remove_dir_all(&dir).ok();
    }
}
