//! Configuration error module.
//!
//! Errors raised while loading, parsing, or validating server configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration handling.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The requested configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The configuration file could not be parsed.
    #[error("Configuration parse error: {0}")]
    ParseError(String),

    /// A configuration value failed validation.
    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    /// Error from the underlying configuration loader.
    #[error("Configuration load error: {0}")]
    LoadError(#[from] config::ConfigError),

    /// I/O error while reading or writing configuration files.
    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}
