//! `floodcast` command-line front end.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use floodcast::alert::assess_flood_status;
use floodcast::chart::{ChartModel, ChartSeries, ChartSize, TimeScale, render_chart};
use floodcast::config::{
    AppConfiguration, DisplayPrefs, DisplayTimezone, Theme, TimeRange, TomlFileStore,
};
use floodcast::forecast::freshness::{is_stale_at, latest_observation_age_minutes};
use floodcast::forecast::{AdjustedForecast, build_adjusted_forecast, delta_series};
use floodcast::ingest::NoaaClient;
use floodcast::logging::{self, DataSource, LogLevel};
use floodcast::model::parse_key;
use floodcast::stations::{STATION_REGISTRY, find_station};

/// Tide and storm-surge forecasts from NOAA CO-OPS water levels.
#[derive(Parser, Debug)]
#[command(name = "floodcast")]
#[command(about = "Surge-adjusted tide forecasts and flood threshold crossings")]
#[command(version)]
struct Args {
    /// Path to the settings file (TOML)
    #[arg(short, long, default_value = "floodcast.toml")]
    config: PathBuf,

    /// Log level (debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also append log entries to this file
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch data, estimate the surge offset and report the flood outlook
    Forecast {
        /// Station id for this run only
        #[arg(long)]
        station: Option<String>,

        /// Flood threshold for this run only
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f64>,

        /// Write an SVG chart to this path
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Draw the tooltip at this time (YYYY-MM-DDTHH:MMZ)
        #[arg(long, requires = "svg")]
        hover: Option<String>,

        /// Warn when the newest observation is older than this many minutes
        #[arg(long, default_value_t = 60)]
        max_obs_age: i64,
    },
    /// List known stations
    Stations,
    /// Show or change saved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective settings
    Show,
    /// Switch station (adopts the registry threshold when known)
    SetStation { id: String },
    /// Set the flood threshold
    SetThreshold {
        #[arg(allow_hyphen_values = true)]
        value: f64,
    },
    /// "auto" for the computed offset, or a number for a manual offset
    SetSurge {
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Sliding window relative to now
    SetRelativeRange { lookback_hours: i64, lookahead_hours: i64 },
    /// Fixed window (YYYY-MM-DDTHH:MMZ)
    SetAbsoluteRange { start: String, end: String },
    /// Display preferences
    SetDisplay {
        #[arg(long, value_parser = ["utc", "local"])]
        timezone: Option<String>,
        #[arg(long)]
        show_delta: Option<bool>,
        #[arg(long, value_parser = ["light", "dark"])]
        theme: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let level: LogLevel = args
        .log_level
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    logging::init_logger(level, args.log_file.as_deref(), false);

    let store = TomlFileStore::new(&args.config);
    let mut config = AppConfiguration::load(&store);

    match args.command {
        Command::Forecast {
            station,
            threshold,
            svg,
            hover,
            max_obs_age,
        } => {
            config
                .apply_env_overrides()
                .context("invalid FLOODCAST_* environment override")?;
            if let Some(id) = station {
                config.set_station(&id)?;
            }
            if let Some(value) = threshold {
                config.set_flood_threshold(value)?;
            }
            run_forecast(&config, svg, hover, max_obs_age)
        }
        Command::Stations => {
            for s in STATION_REGISTRY {
                println!(
                    "{}  {:<40} threshold {:>5.1} ft {}",
                    s.id, s.name, s.flood_threshold_ft, s.datum
                );
            }
            Ok(())
        }
        Command::Config { action } => run_config(&mut config, &store, action),
    }
}

fn run_forecast(
    config: &AppConfiguration,
    svg: Option<PathBuf>,
    hover: Option<String>,
    max_obs_age: i64,
) -> Result<()> {
    let now = Utc::now();
    let request = config.forecast_request(now)?;
    let units = config.units.label();

    let client = NoaaClient::new()?;
    let forecast = build_adjusted_forecast(&client, &request)
        .with_context(|| format!("forecast for station {} failed", config.station))?;

    let name = find_station(&config.station).map(|s| s.name).unwrap_or("unregistered station");
    println!("Station:  {} ({})", config.station, name);
    println!(
        "Offset:   {:+.2} {} ({} paired samples, median {:+.2})",
        forecast.offset, units, forecast.n, forecast.estimate.offset
    );

    match latest_observation_age_minutes(&forecast.observed, now) {
        Some(age) => println!("Latest observation: {} min ago", age),
        None => println!("Latest observation: none in lookback window"),
    }
    if is_stale_at(&forecast.observed, max_obs_age, now) {
        logging::warn(
            DataSource::Forecast,
            Some(&config.station),
            &format!("observations older than {} min; offset may be outdated", max_obs_age),
        );
    }

    let adjusted = forecast.adjusted.to_points();
    let status = assess_flood_status(&adjusted, config.flood_threshold, now);
    println!("Status:   {}", status.message(config.flood_threshold, units));

    if let Some(path) = svg {
        let pointer = match hover {
            Some(raw) => Some(parse_key(&raw).with_context(|| format!("bad --hover time '{}'", raw))?),
            None => None,
        };
        let chart = render_svg(config, &forecast, now, pointer)?;
        fs::write(&path, chart).with_context(|| format!("writing {:?}", path))?;
        logging::info(DataSource::System, None, &format!("chart written to {:?}", path));
    }

    Ok(())
}

fn render_svg(
    config: &AppConfiguration,
    forecast: &AdjustedForecast,
    now: DateTime<Utc>,
    pointer: Option<DateTime<Utc>>,
) -> Result<String> {
    let (domain_start, domain_end) = config.time_range.window(now)?;
    let size = ChartSize::default();

    let series = ChartSeries {
        observed: forecast.observed.to_points(),
        predicted: forecast.predicted.to_points(),
        adjusted: forecast.adjusted.to_points(),
        delta: config
            .display
            .show_delta
            .then(|| delta_series(&forecast.observed, &forecast.predicted).to_points()),
    };

    let pointer_x = pointer.map(|t| TimeScale::new(domain_start, domain_end, &size).x_of(t));

    let model = ChartModel {
        series: &series,
        threshold: config.flood_threshold,
        domain_start,
        domain_end,
        now: Some(now),
        size,
        pointer_x,
        theme: config.display.theme,
        timezone: config.display.timezone,
        unit_label: config.units.label(),
    };
    let svg = render_chart(&model).to_svg().context("drawing chart")?;
    Ok(svg)
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    parse_key(raw).with_context(|| format!("expected YYYY-MM-DDTHH:MMZ, got '{}'", raw))
}

fn run_config(config: &mut AppConfiguration, store: &TomlFileStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("# {}", store.path().display());
            print!("{}", toml::to_string_pretty(config)?);
            return Ok(());
        }
        ConfigAction::SetStation { id } => config.set_station(&id)?,
        ConfigAction::SetThreshold { value } => config.set_flood_threshold(value)?,
        ConfigAction::SetSurge { value } => {
            if value.eq_ignore_ascii_case("auto") {
                config.set_manual_offset(None)?
            } else {
                let offset: f64 = value
                    .parse()
                    .with_context(|| format!("surge must be 'auto' or a number, got '{}'", value))?;
                config.set_manual_offset(Some(offset))?
            }
        }
        ConfigAction::SetRelativeRange {
            lookback_hours,
            lookahead_hours,
        } => config.set_time_range(TimeRange::Relative {
            lookback_hours,
            lookahead_hours,
        })?,
        ConfigAction::SetAbsoluteRange { start, end } => config.set_time_range(TimeRange::Absolute {
            start: parse_instant(&start)?,
            end: parse_instant(&end)?,
        })?,
        ConfigAction::SetDisplay {
            timezone,
            show_delta,
            theme,
        } => {
            let mut display: DisplayPrefs = config.display;
            match timezone.as_deref() {
                Some("utc") => display.timezone = DisplayTimezone::Utc,
                Some("local") => display.timezone = DisplayTimezone::Local,
                Some(other) => bail!("unknown timezone '{}'", other),
                None => {}
            }
            match theme.as_deref() {
                Some("light") => display.theme = Theme::Light,
                Some("dark") => display.theme = Theme::Dark,
                Some(other) => bail!("unknown theme '{}'", other),
                None => {}
            }
            if let Some(show) = show_delta {
                display.show_delta = show;
            }
            config.display = display;
        }
    }

    config.save(store)?;
    logging::info(
        DataSource::Config,
        None,
        &format!("settings saved to {}", store.path().display()),
    );
    Ok(())
}
