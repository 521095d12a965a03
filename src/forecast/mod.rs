//! Next-day infection forecast.
//!
//! Workflow: features -> split labeled rows -> scale (fit on train) -> OLS ->
//! held-out R² -> predict from the last row.
//!
//! The scaler only ever sees training rows. Test rows and the live row are
//! transformed with the training statistics so the reported score is not
//! computed on data that leaked into preprocessing.

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::domain::{ForecastConfig, Observation};
use crate::error::AppError;
use crate::math::LinearModel;

pub mod features;
pub mod scale;
pub mod split;

pub use features::FeatureTable;
pub use scale::StandardScaler;
pub use split::{Split, train_test_split};

/// Everything a forecast run produces.
#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub n_rows: usize,
    pub n_features: usize,
    pub train_size: usize,
    pub test_size: usize,
    /// R² on the held-out rows.
    pub confidence: f64,
    pub forecast_date: NaiveDate,
    pub forecast: f64,
    pub model: LinearModel,
}

impl ForecastReport {
    /// Forecast rounded half-up to a whole count.
    pub fn rounded(&self) -> i64 {
        (self.forecast + 0.5).floor() as i64
    }
}

pub fn run_forecast(observations: &[Observation], config: &ForecastConfig) -> Result<ForecastReport, AppError> {
    config.validate()?;

    let last = observations
        .last()
        .ok_or_else(|| AppError::new(3, "Input has no rows."))?;
    let last_date = last.calendar_date().ok_or_else(|| {
        AppError::new(3, format!("Last date {} is not a valid YYYYMMDD date.", last.date))
    })?;
    let forecast_date = last_date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::new(3, "Forecast date is out of range."))?;

    let table = FeatureTable::build(observations, config.lookback_window);
    let rows = table.predictor_rows();
    let labels = table.known_labels();
    let (labeled_rows, live_row) = rows.split_at(labels.len());

    let split = train_test_split(labeled_rows.len(), config.test_fraction, config.seed).ok_or_else(|| {
        AppError::new(
            3,
            format!(
                "Not enough rows to split: {} labeled rows with test fraction {}.",
                labeled_rows.len(),
                config.test_fraction
            ),
        )
    })?;
    debug!(train = split.train.len(), test = split.test.len(), seed = ?config.seed, "split labeled rows");

    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
        idx.iter().map(|&i| (labeled_rows[i].clone(), labels[i])).unzip()
    };
    let (x_train, y_train) = pick(&split.train);
    let (x_test, y_test) = pick(&split.test);

    let scaler = StandardScaler::fit(&x_train)
        .ok_or_else(|| AppError::new(3, "Training partition is empty."))?;
    let x_train = scaler.transform(&x_train);
    let x_test = scaler.transform(&x_test);
    let x_live = scaler.transform_row(&live_row[0]);

    let model = LinearModel::fit(&x_train, &y_train)
        .ok_or_else(|| AppError::new(3, "Least squares solve failed (design matrix too ill-conditioned)."))?;
    let confidence = model.score(&x_test, &y_test);
    let forecast = model.predict(&x_live);
    if !forecast.is_finite() {
        return Err(AppError::new(3, "Model produced a non-finite forecast."));
    }

    Ok(ForecastReport {
        n_rows: table.n_rows(),
        n_features: x_live.len(),
        train_size: y_train.len(),
        test_size: y_test.len(),
        confidence,
        forecast_date,
        forecast,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_growth(n: usize) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2020, 3, 20).unwrap();
        (0..n)
            .map(|i| {
                let d = start + Days::new(i as u64);
                let date: u32 = d.format("%Y%m%d").to_string().parse().unwrap();
                let i = i as i64;
                Observation::new(date, 100 + 20 * i, 5 * i, 2 * i)
            })
            .collect()
    }

    fn config(seed: u64) -> ForecastConfig {
        ForecastConfig {
            seed: Some(seed),
            ..ForecastConfig::default()
        }
    }

    #[test]
    fn linear_series_forecasts_next_value() {
        let obs = linear_growth(40);
        let report = run_forecast(&obs, &config(3)).unwrap();

        // 40 rows -> 39 labeled -> ceil(7.8) = 8 test rows.
        assert_eq!(report.test_size, 8);
        assert_eq!(report.train_size, 31);
        assert_eq!(report.n_features, 3 + 3 * 8);
        assert!((report.forecast - 900.0).abs() < 1e-4, "forecast {}", report.forecast);
        assert_eq!(report.rounded(), 900);
        assert!(report.confidence.is_finite());
    }

    #[test]
    fn forecast_date_is_day_after_last_observation() {
        let obs = linear_growth(40);
        let report = run_forecast(&obs, &config(1)).unwrap();
        assert_eq!(report.forecast_date, NaiveDate::from_ymd_opt(2020, 4, 29).unwrap());
        assert_eq!(report.n_rows, 40);
    }

    #[test]
    fn oversized_window_is_a_config_error() {
        let obs = linear_growth(5);
        let config = ForecastConfig {
            lookback_window: usize::MAX,
            ..config(1)
        };
        let err = run_forecast(&obs, &config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let mut obs = linear_growth(30);
        // Break exact linearity so the score depends on the split.
        obs[7].infected += 13;
        obs[19].infected -= 9;

        let a = run_forecast(&obs, &config(11)).unwrap();
        let b = run_forecast(&obs, &config(11)).unwrap();
        assert_eq!(a.confidence.to_bits(), b.confidence.to_bits());
        assert_eq!(a.forecast.to_bits(), b.forecast.to_bits());
    }

    #[test]
    fn too_few_rows_is_an_error() {
        let obs = linear_growth(2);
        let err = run_forecast(&obs, &config(0)).unwrap_err();
        assert_eq!(err.exit_code(), 3);

        assert_eq!(run_forecast(&[], &config(0)).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn invalid_last_date_is_rejected() {
        let mut obs = linear_growth(12);
        obs.last_mut().unwrap().date = 20201340;
        assert!(run_forecast(&obs, &config(0)).is_err());
    }
}
