//! Feature engineering: day index, lag columns, next-day label.
//!
//! Column layout, in order:
//!
//! - `day`: 0..N-1, stands in for the date (the raw `YYYYMMDD` integer is not
//!   linear in time)
//! - `infected`, `cured`, `deaths`
//! - for lag `1..=K`, for each metric: `<metric>_prev<lag>`, the value `lag`
//!   rows earlier, zero where no such row exists
//!
//! The label of row `i` is `infected[i + 1]`; the last row has none and is the
//! input for the live forecast.

use crate::domain::{Metric, Observation};

pub const INDEX_COLUMN: &str = "day";

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<f64>,
    /// Index and date-like columns are kept for inspection, not regression.
    pub is_predictor: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub dates: Vec<u32>,
    pub columns: Vec<FeatureColumn>,
    pub labels: Vec<Option<f64>>,
}

impl FeatureTable {
    pub fn build(observations: &[Observation], lookback: usize) -> Self {
        let n = observations.len();
        let capacity = lookback
            .checked_add(1)
            .and_then(|k| k.checked_mul(Metric::ALL.len()))
            .and_then(|c| c.checked_add(1))
            .unwrap_or(0);
        let mut columns = Vec::with_capacity(capacity);

        columns.push(FeatureColumn {
            name: INDEX_COLUMN.to_string(),
            values: (0..n).map(|i| i as f64).collect(),
            is_predictor: false,
        });

        for metric in Metric::ALL {
            columns.push(FeatureColumn {
                name: metric.column_name().to_string(),
                values: observations.iter().map(|o| o.metric(metric) as f64).collect(),
                is_predictor: true,
            });
        }

        for lag in 1..=lookback {
            for metric in Metric::ALL {
                let values = (0..n)
                    .map(|i| {
                        i.checked_sub(lag)
                            .map(|j| observations[j].metric(metric) as f64)
                            .unwrap_or(0.0)
                    })
                    .collect();
                columns.push(FeatureColumn {
                    name: lag_column_name(metric, lag),
                    values,
                    is_predictor: true,
                });
            }
        }

        let labels = (0..n)
            .map(|i| observations.get(i + 1).map(|o| o.infected as f64))
            .collect();

        Self {
            dates: observations.iter().map(|o| o.date).collect(),
            columns,
            labels,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn predictor_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_predictor)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Row-major predictor matrix, one row per observation.
    pub fn predictor_rows(&self) -> Vec<Vec<f64>> {
        let predictors: Vec<&FeatureColumn> = self.columns.iter().filter(|c| c.is_predictor).collect();
        (0..self.n_rows())
            .map(|i| predictors.iter().map(|c| c.values[i]).collect())
            .collect()
    }

    /// Labels of every row except the last, which has none.
    pub fn known_labels(&self) -> Vec<f64> {
        self.labels.iter().map_while(|l| *l).collect()
    }
}

pub fn lag_column_name(metric: Metric, lag: usize) -> String {
    format!("{}_prev{lag}", metric.column_name())
}
