//! Reporting utilities: summary statistics and terminal output.

pub mod format;

pub use format::*;

use crate::domain::{Metric, Observation};

/// Descriptive statistics of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); NaN for a single value.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summarize `date`, the three metrics and the day index.
pub fn describe(observations: &[Observation]) -> Vec<ColumnSummary> {
    let mut columns: Vec<(String, Vec<f64>)> = Vec::with_capacity(5);
    columns.push(("date".to_string(), observations.iter().map(|o| o.date as f64).collect()));
    for metric in Metric::ALL {
        columns.push((
            metric.column_name().to_string(),
            observations.iter().map(|o| o.metric(metric) as f64).collect(),
        ));
    }
    columns.push((
        crate::forecast::features::INDEX_COLUMN.to_string(),
        (0..observations.len()).map(|i| i as f64).collect(),
    ));

    columns
        .into_iter()
        .map(|(name, values)| summarize(name, values))
        .collect()
}

fn summarize(name: String, mut values: Vec<f64>) -> ColumnSummary {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let count = values.len();
    let mean = if count == 0 {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / count as f64
    };
    let std = if count < 2 {
        f64::NAN
    } else {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
    };

    ColumnSummary {
        name,
        count,
        mean,
        std,
        min: values.first().copied().unwrap_or(f64::NAN),
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values.last().copied().unwrap_or(f64::NAN),
    }
}

/// Linear-interpolation quantile of already sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_matches_hand_computed_values() {
        let obs = vec![
            Observation::new(20200510, 100, 10, 1),
            Observation::new(20200511, 120, 12, 1),
            Observation::new(20200512, 150, 15, 2),
            Observation::new(20200513, 170, 20, 2),
        ];
        let summary = describe(&obs);
        let names: Vec<&str> = summary.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["date", "infected", "cured", "deaths", "day"]);

        let infected = &summary[1];
        assert_eq!(infected.count, 4);
        assert!((infected.mean - 135.0).abs() < 1e-12);
        assert_eq!(infected.min, 100.0);
        assert_eq!(infected.max, 170.0);
        // Positions 0.75 and 2.25 between sorted values.
        assert!((infected.q25 - 115.0).abs() < 1e-12);
        assert!((infected.median - 135.0).abs() < 1e-12);
        assert!((infected.q75 - 155.0).abs() < 1e-12);
        // Sample std of [100,120,150,170].
        let expected = ((35.0f64.powi(2) + 15.0f64.powi(2) * 2.0 + 35.0f64.powi(2)) / 3.0).sqrt();
        assert!((infected.std - expected).abs() < 1e-12);
    }

    #[test]
    fn single_row_has_undefined_std() {
        let summary = describe(&[Observation::new(20200510, 1, 0, 0)]);
        assert!(summary[1].std.is_nan());
        assert_eq!(summary[1].median, 1.0);
    }
}
