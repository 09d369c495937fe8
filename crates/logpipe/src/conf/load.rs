//! Load: config loading from file and environment variables.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::{FlushConfig, LogTypeConfig, LogpipeConfig};

const DEFAULT_CONFIG_PATH: &str = "/etc/logpipe/logpipe.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl LogpipeConfig {
    /// Load configuration from file or environment variables.
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("LOGPIPE_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!(
                "Config file not found at {}, using environment variables",
                config_path
            );
            Self::from_env()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// A single log type described by `LOGPIPE_LOG_TYPE` (plus optional
    /// `LOGPIPE_LOG_NAME` and comma-separated `LOGPIPE_INCLUDE_PATHS`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_types = match lookup("LOGPIPE_LOG_TYPE") {
            Some(log_type) => {
                let name = lookup("LOGPIPE_LOG_NAME").unwrap_or_else(|| log_type.clone());
                let mut entry = LogTypeConfig::new(&name, &log_type);
                entry.include_paths = lookup("LOGPIPE_INCLUDE_PATHS")
                    .map(|paths| {
                        paths
                            .split(',')
                            .map(str::trim)
                            .filter(|p| !p.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                vec![entry]
            }
            None => Vec::new(),
        };

        Self {
            flush: FlushConfig::default(),
            log_types,
        }
    }

    /// Environment variables override file config for the flush settings.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ms) = lookup("LOGPIPE_FLUSH_TIMEOUT_MS").and_then(|s| s.parse().ok()) {
            self.flush.timeout_ms = ms;
        }
        if let Some(ms) = lookup("LOGPIPE_FLUSH_INTERVAL_MS").and_then(|s| s.parse().ok()) {
            self.flush.interval_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.flush.validate()?;

        if self.log_types.is_empty() {
            return Err(ConfigError::Invalid(
                "no log_types configured (set LOGPIPE_LOG_TYPE or add [[log_types]])".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.log_types {
            if entry.name.is_empty() {
                return Err(ConfigError::Invalid("log_types.name must not be empty".to_string()));
            }
            if entry.log_type.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "log type `{}` has an empty type",
                    entry.name
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "log type name `{}` is used twice",
                    entry.name
                )));
            }
        }
        Ok(())
    }
}

impl FlushConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("flush.timeout_ms must be > 0".to_string()));
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid("flush.interval_ms must be > 0".to_string()));
        }
        Ok(())
    }
}
