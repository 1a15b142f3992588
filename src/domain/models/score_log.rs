//! Per-round score snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::team::Team;

/// Point-in-time copy of one team's score counters.
///
/// Appended once per team per round; never overwrites the live counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLogEntry {
    pub team_id: i64,
    pub time: DateTime<Utc>,
    pub service_points: i64,
    pub sla_violations: i64,
    pub inject_points: i64,
    pub redteam_points: i64,
    pub ir_points: i64,
}

impl ScoreLogEntry {
    /// Snapshot the team's current counters.
    pub fn snapshot(team: &Team, time: DateTime<Utc>) -> Self {
        Self {
            team_id: team.id,
            time,
            service_points: team.service_points,
            sla_violations: team.sla_violations,
            inject_points: team.inject_points,
            redteam_points: team.redteam_points,
            ir_points: team.ir_points,
        }
    }
}
