//! Configuration for a pveoff run
//!
//! Values come from an optional TOML file, then `PVEOFF_*` environment
//! overrides, then validation. The result is immutable for the rest of the run
//! and handed to the resolver and executor by value.

use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PveoffError, PveoffResult};
use crate::types::ShutdownMethod;

pub mod defaults;

pub use defaults::*;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shutdown policy defaults
    pub shutdown: ShutdownConfig,

    /// Management CLI invocation
    pub pvesh: PveshConfig,

    /// Log output
    pub logging: LoggingConfig,
}

/// Defaults applied when a guest does not configure its own policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Method used when a guest has no valid `off-method_` tag
    pub default_method: ShutdownMethod,

    /// Grace period used when a guest has no `down=` or `down=0`
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,

    /// Have the management API force-stop guests that outlive their timeout
    pub must_succeed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PveshConfig {
    /// Path of the pvesh executable
    pub binary: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level, overridden by `RUST_LOG`
    pub level: String,

    /// One of `pretty`, `compact` or `json`
    pub format: String,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            default_method: DEFAULT_SHUTDOWN_METHOD,
            default_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            must_succeed: DEFAULT_MUST_SUCCEED,
        }
    }
}

impl Default for PveshConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_PVESH_BINARY),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl ShutdownConfig {
    /// Default timeout in whole seconds, never zero
    pub fn default_timeout_secs(&self) -> NonZeroU64 {
        NonZeroU64::new(self.default_timeout.as_secs())
            .or_else(|| NonZeroU64::new(DEFAULT_SHUTDOWN_TIMEOUT_SECS))
            .unwrap_or(NonZeroU64::MIN)
    }

    pub fn validate(&self) -> PveoffResult<()> {
        if self.default_timeout.as_secs() == 0 {
            return Err(PveoffError::ConfigError(
                "shutdown.default_timeout must be at least 1s".to_string(),
            ));
        }

        // The default must be applicable to containers as well
        if self.default_method == ShutdownMethod::Suspend {
            return Err(PveoffError::ConfigError(
                "shutdown.default_method cannot be 'suspend': containers do not support it"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl PveshConfig {
    pub fn validate(&self) -> PveoffResult<()> {
        if self.binary.as_os_str().is_empty() {
            return Err(PveoffError::ConfigError(
                "pvesh.binary cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> PveoffResult<()> {
        if !VALID_LOG_LEVELS.contains(&self.level.as_str()) {
            return Err(PveoffError::ConfigError(format!(
                "Invalid log level '{}'. Must be one of: {:?}",
                self.level, VALID_LOG_LEVELS
            )));
        }
        if !VALID_LOG_FORMATS.contains(&self.format.as_str()) {
            return Err(PveoffError::ConfigError(format!(
                "Invalid log format '{}'. Must be one of: {:?}",
                self.format, VALID_LOG_FORMATS
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> PveoffResult<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            PveoffError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| PveoffError::ConfigError(format!("Failed to parse TOML: {}", e)))?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise start from defaults
    pub fn load(path: Option<&Path>) -> PveoffResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let mut config = Self::default();
                config.apply_env_overrides()?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Apply `PVEOFF_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> PveoffResult<()> {
        if let Ok(method) = std::env::var("PVEOFF_DEFAULT_METHOD") {
            self.shutdown.default_method = method.parse().map_err(|_| {
                PveoffError::ConfigError(format!("Invalid PVEOFF_DEFAULT_METHOD '{}'", method))
            })?;
        }
        if let Ok(secs) = std::env::var("PVEOFF_DEFAULT_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                PveoffError::ConfigError(format!("Invalid PVEOFF_DEFAULT_TIMEOUT_SECS '{}'", secs))
            })?;
            self.shutdown.default_timeout = Duration::from_secs(secs);
        }
        if let Ok(flag) = std::env::var("PVEOFF_MUST_SUCCEED") {
            self.shutdown.must_succeed = parse_bool(&flag).ok_or_else(|| {
                PveoffError::ConfigError(format!("Invalid PVEOFF_MUST_SUCCEED '{}'", flag))
            })?;
        }
        if let Ok(binary) = std::env::var("PVEOFF_PVESH_BINARY") {
            self.pvesh.binary = PathBuf::from(binary);
        }
        if let Ok(level) = std::env::var("PVEOFF_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> PveoffResult<()> {
        self.shutdown.validate()?;
        self.pvesh.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Builder for [`Config`]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn default_method(mut self, method: ShutdownMethod) -> Self {
        self.config.shutdown.default_method = method;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown.default_timeout = timeout;
        self
    }

    pub fn must_succeed(mut self, must_succeed: bool) -> Self {
        self.config.shutdown.must_succeed = must_succeed;
        self
    }

    pub fn pvesh_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.config.pvesh.binary = binary.into();
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn log_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    pub fn build(self) -> PveoffResult<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
