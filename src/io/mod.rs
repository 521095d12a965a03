//! Input/output helpers.
//!
//! - observation CSV read/write (`observations`)

pub mod observations;

pub use observations::*;
