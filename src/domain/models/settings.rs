//! Operator-controlled engine settings.
//!
//! Settings live in the store as key/value rows so that the dashboard (or an
//! operator with a SQL shell) can change them while the engine runs. The
//! orchestrator takes a fresh [`Settings`] snapshot at the top of every
//! iteration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

pub const KEY_RUNNING: &str = "running";
pub const KEY_INTERVAL: &str = "interval";
pub const KEY_JITTER: &str = "jitter";
pub const KEY_SLA_LIMIT: &str = "sla_limit";
pub const KEY_SLA_PENALTY: &str = "sla_penalty";
pub const KEY_MAX_SCORE: &str = "max_score";
pub const KEY_CHECK_TIMEOUT: &str = "check_timeout";

/// Consecutive failures that make up one SLA violation unless overridden.
pub const DEFAULT_SLA_THRESHOLD: u32 = 6;

/// Point-in-time copy of the engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub running: bool,
    /// Nominal time between rounds.
    pub interval: Duration,
    /// Maximum random offset applied to `interval` in either direction.
    pub jitter: Duration,
    /// Consecutive failures per check that count as one SLA violation.
    pub sla_threshold: u32,
    pub sla_penalty: i64,
    pub max_score: i64,
    /// Upper bound on a single check invocation.
    pub check_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            running: false,
            interval: Duration::from_secs(60),
            jitter: Duration::ZERO,
            sla_threshold: DEFAULT_SLA_THRESHOLD,
            sla_penalty: 0,
            max_score: 0,
            check_timeout: Duration::from_secs(10),
        }
    }
}

impl Settings {
    /// Build a snapshot from raw key/value rows. Unknown keys are ignored and
    /// missing keys keep their defaults.
    pub fn from_pairs<I, K, V>(pairs: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                KEY_RUNNING => settings.running = parse_bool(key, value)?,
                KEY_INTERVAL => settings.interval = parse_seconds(key, value)?,
                KEY_JITTER => settings.jitter = parse_seconds(key, value)?,
                KEY_SLA_LIMIT => settings.sla_threshold = parse_int(key, value)?,
                KEY_SLA_PENALTY => settings.sla_penalty = parse_int(key, value)?,
                KEY_MAX_SCORE => settings.max_score = parse_int(key, value)?,
                KEY_CHECK_TIMEOUT => settings.check_timeout = parse_seconds(key, value)?,
                _ => {}
            }
        }
        Ok(settings)
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> DomainError {
    DomainError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Accepts the spellings the dashboard and SQL shells produce.
fn parse_bool(key: &str, value: &str) -> DomainResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected a boolean")),
    }
}

/// Seconds, possibly fractional. Negative values and values too large to
/// represent are rejected.
fn parse_seconds(key: &str, value: &str) -> DomainResult<Duration> {
    let secs: f64 = value
        .parse()
        .map_err(|_| invalid(key, value, "expected a number of seconds"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(invalid(key, value, "must be a non-negative number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid(key, value, "out of range"))
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> DomainResult<T> {
    value
        .parse()
        .map_err(|_| invalid(key, value, "expected an integer"))
}
