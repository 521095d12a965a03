//! `covid-stats` library crate.
//!
//! The binary (`covid`) is a thin wrapper around this library so that:
//!
//! - collection and forecasting logic is testable without a browser or a process
//! - captured network traffic can be replayed through the same collector code

pub mod app;
pub mod cli;
pub mod collect;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod io;
pub mod logging;
pub mod math;
pub mod plot;
pub mod report;
