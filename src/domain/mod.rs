//! Domain types used by both pipelines.
//!
//! This module defines:
//!
//! - the daily observation record (`Observation`) and its metric columns
//! - run configuration for the collector (`CollectConfig`) and the
//!   forecaster (`ForecastConfig`)

pub mod types;

pub use types::*;
