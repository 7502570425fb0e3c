#![forbid(unsafe_code)]

//! Command-line interface utilities: configuration, logging and CSV import.
//!
//! The `relchain` binary is a thin layer over these helpers so they can be
//! exercised without spawning a process.

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

use crate::types::RelchainError;

/// Persistent CLI configuration stored as TOML.
pub mod config;

/// Building a store from a CSV edge list.
///
/// Reads `first,second,type` rows, lays the relationships out into chains and
/// groups, and writes the result as a file-backed store.
pub mod import;

/// Error type for CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV parsing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// Configuration file error.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Storage or traversal error.
    #[error(transparent)]
    Store(#[from] RelchainError),
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        CliError::Message(value.to_string())
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        CliError::Message(value)
    }
}

/// Installs a `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` wins over `level` when it is set and parses.
pub fn init_logging(level: &str) -> Result<(), CliError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| CliError::Message(format!("invalid log level '{level}': {e}")))?,
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| CliError::Message("logging already initialized".into()))
}
