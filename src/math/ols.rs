//! Ordinary least squares.
//!
//! The forecaster solves one small regression per run:
//!
//! ```text
//! minimize Σ (y_i - b - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - The intercept is handled by centering: solve for β on mean-removed
//!   columns, then `b = ȳ - x̄^T β`. This keeps the intercept out of the
//!   minimum-norm criterion when lag columns are collinear.
//! - SVD solve, so tall and rank-deficient design matrices both work.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// A fitted linear model `y = intercept + coefficients · x`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Fit on row-major `rows` (all the same width) against `targets`.
    ///
    /// Returns `None` for empty input, ragged rows, or a failed solve.
    pub fn fit(rows: &[Vec<f64>], targets: &[f64]) -> Option<Self> {
        let n = rows.len();
        if n == 0 || n != targets.len() {
            return None;
        }
        let p = rows[0].len();
        if rows.iter().any(|r| r.len() != p) {
            return None;
        }

        let x_mean: Vec<f64> = (0..p)
            .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n as f64)
            .collect();
        let y_mean = targets.iter().sum::<f64>() / n as f64;

        if p == 0 {
            return Some(Self {
                intercept: y_mean,
                coefficients: Vec::new(),
            });
        }

        let x = DMatrix::from_fn(n, p, |i, j| rows[i][j] - x_mean[j]);
        let y = DVector::from_iterator(n, targets.iter().map(|t| t - y_mean));
        let beta = solve_least_squares(&x, &y)?;

        let intercept = y_mean - beta.iter().zip(&x_mean).map(|(b, m)| b * m).sum::<f64>();
        Some(Self {
            intercept,
            coefficients: beta.iter().copied().collect(),
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }

    /// Coefficient of determination on the given rows.
    pub fn score(&self, rows: &[Vec<f64>], targets: &[f64]) -> f64 {
        let predicted: Vec<f64> = rows.iter().map(|r| self.predict(r)).collect();
        r_squared(targets, &predicted)
    }
}

/// `R² = 1 - SS_res / SS_tot`.
///
/// For a constant truth (`SS_tot = 0`) this is `1.0` on a perfect prediction
/// and `0.0` otherwise. Empty input gives `NaN`.
pub fn r_squared(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() || truth.len() != predicted.len() {
        return f64::NAN;
    }
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
