//! Scan Common - Shared configuration, errors and logging for the signal scanner.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types
//! - Logging setup with noise filtering

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    Config, DataSourceConfig, EmailConfig, ObservabilityConfig, PrefilterConfig, ScannerConfig,
};
pub use error::{Error, Result};

