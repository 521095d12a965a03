//! Shared domain types.
//!
//! Observations are kept small and `Copy` so both pipelines can pass slices of
//! them around freely; configs are plain structs built once from CLI args.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Dashboard page whose embedded report issues the batch data request.
pub const DEFAULT_SOURCE_URL: &str = "https://koronavirus.gov.mk/stat";

/// Column names of the observation CSV, in file order.
pub const COLUMN_NAMES: [&str; 4] = ["date", "infected", "cured", "deaths"];

/// One day's cumulative case counts.
///
/// `date` is kept in its on-the-wire `YYYYMMDD` integer form; use
/// [`Observation::calendar_date`] when calendar arithmetic is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub date: u32,
    pub infected: i64,
    pub cured: i64,
    pub deaths: i64,
}

impl Observation {
    pub fn new(date: u32, infected: i64, cured: i64, deaths: i64) -> Self {
        Self {
            date,
            infected,
            cured,
            deaths,
        }
    }

    /// The value of one metric column.
    pub fn metric(&self, metric: Metric) -> i64 {
        match metric {
            Metric::Infected => self.infected,
            Metric::Cured => self.cured,
            Metric::Deaths => self.deaths,
        }
    }

    /// Interpret `date` as a calendar date. `None` if it is not a real day.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        parse_yyyymmdd(self.date)
    }
}

/// Parse an integer `YYYYMMDD` date.
pub fn parse_yyyymmdd(value: u32) -> Option<NaiveDate> {
    let year = (value / 10_000) as i32;
    let month = (value / 100) % 100;
    let day = value % 100;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// The three count columns of an observation (everything except the date).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Infected,
    Cured,
    Deaths,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Infected, Metric::Cured, Metric::Deaths];

    pub fn column_name(self) -> &'static str {
        match self {
            Metric::Infected => "infected",
            Metric::Cured => "cured",
            Metric::Deaths => "deaths",
        }
    }
}

/// Configuration for a single collector run.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub source_url: String,
    /// Show the browser window and log at debug level.
    pub debug_mode: bool,
    /// Upper bound on how long to wait for the data request to show up.
    pub capture_timeout: Duration,
    /// Explicit output file; `None` means `<output_dir>/data_<last date>.csv`.
    pub output: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Replay a saved capture file instead of launching a browser.
    pub replay: Option<PathBuf>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            debug_mode: false,
            capture_timeout: Duration::from_secs(15),
            output: None,
            output_dir: PathBuf::from("data"),
            replay: None,
        }
    }
}

impl CollectConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.capture_timeout.is_zero() {
            return Err(AppError::new(2, "`--timeout-secs` must be at least 1."));
        }
        Ok(())
    }
}

/// Longest lookback accepted for lag features, in days.
pub const MAX_LOOKBACK_WINDOW: usize = 365;

/// Configuration for a single forecaster run.
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub input: PathBuf,
    /// Number of prior days copied into lag columns for each metric.
    pub lookback_window: usize,
    /// Share of labeled rows held out for scoring.
    pub test_fraction: f64,
    /// Fixed seed for the train/test shuffle; `None` draws from entropy.
    pub seed: Option<u64>,
    pub show_info: bool,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            lookback_window: 8,
            test_fraction: 0.2,
            seed: None,
            show_info: false,
            plot: false,
            plot_width: 80,
            plot_height: 20,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.lookback_window == 0 || self.lookback_window > MAX_LOOKBACK_WINDOW {
            return Err(AppError::new(
                2,
                format!(
                    "`--window` must be between 1 and {MAX_LOOKBACK_WINDOW} (got {}).",
                    self.lookback_window
                ),
            ));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(AppError::new(
                2,
                format!(
                    "`--test-fraction` must be strictly between 0 and 1 (got {}).",
                    self.test_fraction
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_date_parses_yyyymmdd() {
        let obs = Observation::new(20200514, 1, 0, 0);
        assert_eq!(obs.calendar_date(), NaiveDate::from_ymd_opt(2020, 5, 14));
        assert_eq!(parse_yyyymmdd(20200231), None);
    }

    #[test]
    fn forecast_config_rejects_bad_fraction() {
        let mut config = ForecastConfig::default();
        assert!(config.validate().is_ok());

        config.test_fraction = 1.0;
        assert_eq!(config.validate().unwrap_err().exit_code(), 2);

        config.test_fraction = 0.2;
        config.lookback_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn collect_config_rejects_zero_timeout() {
        let mut config = CollectConfig::default();
        assert!(config.validate().is_ok());

        config.capture_timeout = Duration::ZERO;
        assert_eq!(config.validate().unwrap_err().exit_code(), 2);
    }

    #[test]
    fn forecast_config_bounds_window() {
        let mut config = ForecastConfig {
            lookback_window: MAX_LOOKBACK_WINDOW,
            ..ForecastConfig::default()
        };
        assert!(config.validate().is_ok());

        config.lookback_window = MAX_LOOKBACK_WINDOW + 1;
        assert_eq!(config.validate().unwrap_err().exit_code(), 2);

        config.lookback_window = usize::MAX;
        assert_eq!(config.validate().unwrap_err().exit_code(), 2);
    }
}
