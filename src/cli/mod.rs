//! Command-line parsing for the collector and forecaster.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! collection and modeling code; `app` turns these args into config structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::DEFAULT_SOURCE_URL;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "covid", version, about = "COVID-19 daily case collector and next-day forecaster")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load the statistics dashboard in Chromium and save its daily case table as CSV.
    Collect(CollectArgs),
    /// Fit a lag-feature linear model to a case CSV and forecast the next day.
    Forecast(ForecastArgs),
}

#[derive(Debug, Args, Clone)]
pub struct CollectArgs {
    /// Dashboard page to load.
    #[arg(long, default_value = DEFAULT_SOURCE_URL)]
    pub url: String,

    /// Show the browser window and log at debug level.
    #[arg(long)]
    pub debug: bool,

    /// Seconds to wait for the data request after the page has loaded.
    #[arg(long, default_value_t = 15)]
    pub timeout_secs: u64,

    /// Output CSV (default: <output-dir>/data_<last date>.csv).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for the default output file name.
    #[arg(long, default_value = "data")]
    pub output_dir: PathBuf,

    /// Read exchanges from a saved capture (JSON array) instead of launching a browser.
    #[arg(long, value_name = "JSON")]
    pub replay: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    /// Observation CSV written by `covid collect`.
    #[arg(short, long, value_name = "CSV")]
    pub input: PathBuf,

    /// Number of prior days copied into lag features.
    #[arg(short, long, default_value_t = 8)]
    pub window: usize,

    /// Share of labeled rows held out for scoring.
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Seed for the train/test shuffle (random when omitted).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print shape and descriptive statistics of the input.
    #[arg(long)]
    pub info: bool,

    /// Render an ASCII plot of the input series.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Log at debug level.
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_defaults() {
        let cli = Cli::parse_from(["covid", "forecast", "--input", "data/data_20200514.csv"]);
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.window, 8);
        assert_eq!(args.test_fraction, 0.2);
        assert_eq!(args.seed, None);
    }

    #[test]
    fn collect_defaults() {
        let cli = Cli::parse_from(["covid", "collect", "--debug"]);
        let Command::Collect(args) = cli.command else {
            panic!("expected collect");
        };
        assert!(args.debug);
        assert_eq!(args.url, DEFAULT_SOURCE_URL);
        assert_eq!(args.timeout_secs, 15);
        assert_eq!(args.output_dir, PathBuf::from("data"));
    }
}
