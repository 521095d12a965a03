//! Formatted terminal output.
//!
//! Formatting lives here so the forecasting code stays free of presentation
//! details and output changes stay in one place.

use crate::forecast::ForecastReport;
use crate::report::ColumnSummary;

/// Shape line plus a describe-style table (one row per statistic).
pub fn format_describe(n_rows: usize, summary: &[ColumnSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Shape: ({n_rows}, {})\n", summary.len()));

    out.push_str(&format!("{:<6}", ""));
    for col in summary {
        out.push_str(&format!(" {:>14}", col.name));
    }
    out.push('\n');

    let stats: [(&str, fn(&ColumnSummary) -> f64); 8] = [
        ("count", |c| c.count as f64),
        ("mean", |c| c.mean),
        ("std", |c| c.std),
        ("min", |c| c.min),
        ("25%", |c| c.q25),
        ("50%", |c| c.median),
        ("75%", |c| c.q75),
        ("max", |c| c.max),
    ];
    for (label, get) in stats {
        out.push_str(&format!("{label:<6}"));
        for col in summary {
            out.push_str(&format!(" {:>14}", fmt_stat(get(col))));
        }
        out.push('\n');
    }

    out
}

/// Train/test sizes, held-out score and the next-day forecast.
pub fn format_forecast(report: &ForecastReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Train data size: {}\n", report.train_size));
    out.push_str(&format!("Test data size: {}\n", report.test_size));
    out.push_str(&format!("Confidence: {}\n", fmt_stat(report.confidence)));
    out.push_str(&format!(
        "Forecast for date {}: {:.4} infected ({} rounded)\n",
        report.forecast_date.format("%Y/%m/%d"),
        report.forecast,
        report.rounded()
    ));
    out
}

fn fmt_stat(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{v:.6}")
    }
}
