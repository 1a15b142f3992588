//! Team domain model.

use serde::{Deserialize, Serialize};

/// A competing team and its live score counters.
///
/// Counters are owned by the result store. The round orchestrator awards
/// service points, and the SLA calculator overwrites `sla_violations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    /// Number the team is known by on the network (substituted into check hosts).
    pub team_num: i64,
    pub service_points: i64,
    pub sla_violations: i64,
    pub inject_points: i64,
    pub redteam_points: i64,
    pub ir_points: i64,
}

/// Orders teams the way the engine enumerates them: by display name.
pub fn sort_by_name(teams: &mut [Team]) {
    teams.sort_by(|a, b| a.name.cmp(&b.name));
}
