//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - builds run configs
//! - runs the collect or forecast workflow and prints its output

use std::time::Duration;

use clap::Parser;

use crate::cli::{CollectArgs, Command, ForecastArgs};
use crate::domain::{CollectConfig, ForecastConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `covid` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Collect(args) => handle_collect(args),
        Command::Forecast(args) => handle_forecast(args),
    }
}

fn handle_collect(args: CollectArgs) -> Result<(), AppError> {
    crate::logging::init(args.debug);
    let config = collect_config_from_args(&args);
    let run = pipeline::run_collect(&config)?;
    println!("{}", run.path.display());
    Ok(())
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    crate::logging::init(args.debug);
    let config = forecast_config_from_args(&args);
    let run = pipeline::run_forecast_file(&config)?;

    if config.show_info {
        let summary = crate::report::describe(&run.observations);
        println!("{}", crate::report::format_describe(run.report.n_rows, &summary));
    }
    if config.plot {
        println!(
            "{}",
            crate::plot::render_series_plot(&run.observations, config.plot_width, config.plot_height)
        );
    }

    print!("{}", crate::report::format_forecast(&run.report));
    Ok(())
}

pub fn collect_config_from_args(args: &CollectArgs) -> CollectConfig {
    CollectConfig {
        source_url: args.url.clone(),
        debug_mode: args.debug,
        capture_timeout: Duration::from_secs(args.timeout_secs),
        output: args.output.clone(),
        output_dir: args.output_dir.clone(),
        replay: args.replay.clone(),
    }
}

pub fn forecast_config_from_args(args: &ForecastArgs) -> ForecastConfig {
    ForecastConfig {
        input: args.input.clone(),
        lookback_window: args.window,
        test_fraction: args.test_fraction,
        seed: args.seed,
        show_info: args.info,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
    }
}
