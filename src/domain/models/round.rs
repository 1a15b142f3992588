//! Rounds and the results recorded within them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of one evaluation round. Strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundId(pub i64);

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub id: RoundId,
    pub started_at: DateTime<Utc>,
}

/// A result to be appended for one (team, check) pair in a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResult {
    pub round_id: RoundId,
    pub team_id: i64,
    pub check_id: i64,
    pub time: DateTime<Utc>,
    pub outcome: bool,
}

/// An immutable, persisted check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub id: i64,
    pub round_id: RoundId,
    pub team_id: i64,
    pub check_id: i64,
    pub time: DateTime<Utc>,
    pub outcome: bool,
}
