//! # SVG Rework Common
//!
//! Logging setup shared by the svgrework library crates and the CLI.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LoggingError};
