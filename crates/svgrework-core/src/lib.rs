//! SVG Rework Core Library
//!
//! This crate provides the shared configuration and error types for svgrework.

pub mod config;
pub mod error;

pub use config::TransformConfig;
pub use error::{SvgReworkError, SvgReworkResult};
