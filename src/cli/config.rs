use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{BuildOptions, DEFAULT_DENSE_THRESHOLD};
use crate::traversal::TraversalOptions;

/// Log level used when neither the config file nor the command line sets one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// CLI settings loaded from `cli.toml`.
///
/// A missing file is not an error; every setting falls back to its default.
#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
}

impl CliConfig {
    /// Loads the config from `explicit`, or from [`default_config_path`].
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        if data.build.dense_threshold == Some(0) {
            return Err(ConfigError::InvalidThreshold);
        }
        Ok(Self { path, data })
    }

    /// Path the config was looked up at.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Store directory used when a command omits one.
    pub fn default_store(&self) -> Option<&PathBuf> {
        self.data.store.default_path.as_ref()
    }

    /// Configured log filter, or [`DEFAULT_LOG_LEVEL`].
    pub fn log_level(&self) -> &str {
        self.data.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Traversal options derived from the `[traversal]` section.
    pub fn traversal_options(&self) -> TraversalOptions {
        TraversalOptions::new().cycle_guard(self.data.traversal.cycle_guard.unwrap_or(false))
    }

    /// Build options derived from the `[build]` section.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions::default().dense_threshold(
            self.data
                .build
                .dense_threshold
                .unwrap_or(DEFAULT_DENSE_THRESHOLD),
        )
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    traversal: TraversalSection,
    #[serde(default)]
    build: BuildSection,
    #[serde(default)]
    log: LogSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct StoreSection {
    #[serde(rename = "default")]
    default_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct TraversalSection {
    cycle_guard: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct BuildSection {
    dense_threshold: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct LogSection {
    level: Option<String>,
}

/// Errors raised while loading the CLI config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read CLI config {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse CLI config {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// `[build] dense_threshold` was zero.
    #[error("build.dense_threshold must be at least 1")]
    InvalidThreshold,
}

/// `<config dir>/relchain/cli.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("relchain").join("cli.toml"))
}
