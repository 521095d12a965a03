//! Mathematical utilities: least squares and the linear model built on it.

pub mod ols;

pub use ols::*;
