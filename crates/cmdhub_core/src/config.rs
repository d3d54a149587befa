//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe the knobs a Host may set: log level, log directory, fan-out
//!   strategy.
//! - Load them from environment variables or from a Host config document.
//!
//! # Invariants
//! - Missing values fall back to defaults; invalid values are rejected.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable for the log level.
pub const ENV_LOG_LEVEL: &str = "CMDHUB_LOG_LEVEL";
/// Environment variable for the absolute log directory.
pub const ENV_LOG_DIR: &str = "CMDHUB_LOG_DIR";
/// Environment variable for the fan-out strategy (`sequential|concurrent`).
pub const ENV_FANOUT: &str = "CMDHUB_FANOUT";

/// How the plugin registry runs the handlers of one fan-out.
///
/// Outcomes are recorded in registration order under either strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanoutStrategy {
    #[default]
    Sequential,
    Concurrent,
}

impl FanoutStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Concurrent => "concurrent",
        }
    }
}

impl FromStr for FanoutStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(ConfigError::InvalidValue {
                key: ENV_FANOUT,
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub fanout: FanoutStrategy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            fanout: FanoutStrategy::default(),
        }
    }
}

impl CoreConfig {
    /// Loads configuration from `CMDHUB_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = non_blank(lookup(ENV_LOG_LEVEL)) {
            config.log_level = level;
        }
        if let Some(dir) = non_blank(lookup(ENV_LOG_DIR)) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(fanout) = non_blank(lookup(ENV_FANOUT)) {
            config.fanout = fanout.parse()?;
        }
        Ok(config)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => write!(f, "invalid value for {key}: {value}"),
        }
    }
}

impl Error for ConfigError {}
