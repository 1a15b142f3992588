use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "scoring.yaml";

/// Prefix for environment overrides, e.g. `SCORING_ENGINE__MAX_CONCURRENT_CHECKS`.
pub const ENV_PREFIX: &str = "SCORING_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid max_concurrent_checks: {0}. Must be at least 1")]
    InvalidMaxConcurrentChecks(usize),

    #[error("Invalid watcher interval_secs: {0}. Must be at least 1")]
    InvalidWatcherInterval(u64),

    #[error("Duplicate seed team name: {0}")]
    DuplicateTeamName(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `path`, or `scoring.yaml` when no path is given (optional)
    /// 3. Environment variables (`SCORING_*` prefix, `__` separates nested keys)
    ///
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let file = match path {
            Some(path) => {
                anyhow::ensure!(path.exists(), "config file {} does not exist", path.display());
                path.to_path_buf()
            }
            None => DEFAULT_CONFIG_FILE.into(),
        };

        let config: Config = Self::figment(&file)
            .extract()
            .with_context(|| format!("Failed to extract configuration (file: {})", file.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.engine.max_concurrent_checks == 0 {
            return Err(ConfigError::InvalidMaxConcurrentChecks(config.engine.max_concurrent_checks));
        }

        if config.watcher.interval_secs == 0 {
            return Err(ConfigError::InvalidWatcherInterval(config.watcher.interval_secs));
        }

        let mut names = HashSet::new();
        for team in &config.seed.teams {
            if !names.insert(team.name.as_str()) {
                return Err(ConfigError::DuplicateTeamName(team.name.clone()));
            }
        }

        for check in &config.seed.checks {
            if check.name.is_empty() {
                return Err(ConfigError::ValidationFailed("seed check name cannot be empty".to_string()));
            }
            if check.host.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "seed check '{}' host cannot be empty",
                    check.name
                )));
            }
        }

        Ok(())
    }
}
