//! Shared collect/forecast workflows.
//!
//! The CLI front-end only prints what these return:
//! capture -> collector -> CSV, and CSV -> features -> model -> forecast.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::collect::browser::ChromeCapture;
use crate::collect::{BATCH_ENDPOINT, Collector, ReplaySource};
use crate::domain::{CollectConfig, ForecastConfig, Observation};
use crate::error::AppError;
use crate::forecast::{ForecastReport, run_forecast};
use crate::io::{default_output_path, read_observations, write_observations};

/// Outputs of a `covid collect` run.
#[derive(Debug, Clone)]
pub struct CollectRun {
    pub observations: Vec<Observation>,
    pub path: PathBuf,
}

/// Outputs of a `covid forecast` run.
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub observations: Vec<Observation>,
    pub report: ForecastReport,
}

/// Gather observations from the configured source.
///
/// Failures are logged by the collector and come back as an empty vector.
pub fn collect_observations(config: &CollectConfig) -> Vec<Observation> {
    let collector = Collector::new(config);

    match &config.replay {
        Some(path) => {
            debug!(path = %path.display(), "replaying saved capture");
            match ReplaySource::from_file(path) {
                Ok(mut source) => collector.scrape(&mut source),
                Err(err) => {
                    collector.report_failure(&err);
                    Vec::new()
                }
            }
        }
        None => match ChromeCapture::launch(config, BATCH_ENDPOINT) {
            Ok(mut capture) => {
                let rows = collector.scrape(&mut capture);
                capture.close();
                rows
            }
            Err(err) => {
                collector.report_failure(&err);
                Vec::new()
            }
        },
    }
}

/// Collect and write the CSV. An empty collection writes nothing.
pub fn run_collect(config: &CollectConfig) -> Result<CollectRun, AppError> {
    config.validate()?;

    let observations = collect_observations(config);
    if observations.is_empty() {
        error!("Didn't manage to find the data from requests");
        return Err(AppError::new(3, "No data collected; nothing was written."));
    }

    if let Some(pair) = observations.windows(2).find(|w| w[1].date <= w[0].date) {
        warn!(prev = pair[0].date, next = pair[1].date, "dates are not strictly increasing");
    }

    let path = match &config.output {
        Some(path) => path.clone(),
        None => default_output_path(&config.output_dir, &observations)
            .ok_or_else(|| AppError::new(3, "No data collected; nothing was written."))?,
    };

    debug!(path = %path.display(), "writing data");
    write_observations(&path, &observations)?;
    info!(rows = observations.len(), path = %path.display(), "wrote observations");

    Ok(CollectRun { observations, path })
}

/// Load the CSV and run the forecast.
pub fn run_forecast_file(config: &ForecastConfig) -> Result<ForecastRun, AppError> {
    config.validate()?;

    let observations = read_observations(&config.input)?;
    info!(rows = observations.len(), path = %config.input.display(), "loaded observations");

    let report = run_forecast(&observations, config)?;
    debug!(
        intercept = report.model.intercept,
        n_features = report.n_features,
        "fitted linear model"
    );

    Ok(ForecastRun { observations, report })
}
