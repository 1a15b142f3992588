use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::check::DEFAULT_CHECK_KIND;

/// Main configuration structure for the scoring engine.
///
/// This is static process configuration. Round cadence and the `running`
/// flag are operator settings kept in the database instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Round orchestration tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Credential artifact watcher
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Teams and checks to create on startup
    #[serde(default)]
    pub seed: SeedConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    "sqlite:scoring.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Stdout format
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for log files (if None logs only to stdout)
    #[serde(default = "default_log_dir")]
    pub log_dir: Option<PathBuf>,

    /// Enable stdout logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_log_dir() -> Option<PathBuf> {
    Some(PathBuf::from("logs"))
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: default_log_dir(),
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Round orchestration tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// How long before the next round the SLA recomputation fires
    #[serde(default = "default_sla_margin_secs")]
    pub sla_margin_secs: u64,

    /// Upper bound on checks in flight at once
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,
}

const fn default_sla_margin_secs() -> u64 {
    5
}

const fn default_max_concurrent_checks() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sla_margin_secs: default_sla_margin_secs(),
            max_concurrent_checks: default_max_concurrent_checks(),
        }
    }
}

/// Credential artifact watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WatcherConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between artifact refreshes
    #[serde(default = "default_watcher_interval_secs")]
    pub interval_secs: u64,

    /// Directory the per-team credential files are written to
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

const fn default_watcher_interval_secs() -> u64 {
    30
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_watcher_interval_secs(),
            artifact_dir: default_artifact_dir(),
        }
    }
}

/// Teams and checks created at startup if they don't exist yet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SeedConfig {
    #[serde(default)]
    pub teams: Vec<TeamSeed>,

    #[serde(default)]
    pub checks: Vec<CheckSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSeed {
    pub name: String,
    pub team_num: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSeed {
    pub name: String,
    pub system: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_check_kind")]
    pub kind: String,
    #[serde(default = "default_check_points")]
    pub points: i64,
    /// Default credentials handed to every team for this service
    #[serde(default)]
    pub credentials: Vec<CredentialSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSeed {
    pub username: String,
    pub password: String,
}

fn default_check_kind() -> String {
    DEFAULT_CHECK_KIND.to_string()
}

const fn default_check_points() -> i64 {
    1
}
