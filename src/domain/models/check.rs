//! Check definitions and per-team check targets.

use serde::{Deserialize, Serialize};

use super::credential::Credential;
use super::team::Team;

/// Placeholder in a check host that is replaced by the team number.
pub const TEAM_NUM_PLACEHOLDER: &str = "{team_num}";

/// Kind used when a check does not name one.
pub const DEFAULT_CHECK_KIND: &str = "tcp";

/// A service definition that is checked once per team per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDefinition {
    pub id: i64,
    pub name: String,
    /// The system (virtual machine or appliance) this service lives on.
    pub system: String,
    /// Host template, e.g. `10.{team_num}.1.5`.
    pub host: String,
    pub port: u16,
    /// Selects the check capability that evaluates this definition.
    pub kind: String,
    /// Service points awarded to a team for each passing result.
    pub points: i64,
}

impl CheckDefinition {
    /// Resolve the host template for a given team.
    pub fn host_for(&self, team: &Team) -> String {
        self.host
            .replace(TEAM_NUM_PLACEHOLDER, &team.team_num.to_string())
    }
}

/// One checkable endpoint: a team's instance of a check definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTarget {
    pub team: Team,
    pub check: CheckDefinition,
    pub host: String,
    /// Credentials the check may authenticate with, as of the last reload.
    pub credentials: Vec<Credential>,
}

impl CheckTarget {
    pub fn new(team: Team, check: CheckDefinition) -> Self {
        let host = check.host_for(&team);
        Self {
            team,
            check,
            host,
            credentials: Vec::new(),
        }
    }

    /// Attach the credentials belonging to this team's check.
    pub fn with_credentials(mut self, credentials: &[Credential]) -> Self {
        self.credentials = credentials
            .iter()
            .filter(|c| c.team_id == self.team.id && c.check_id == self.check.id)
            .cloned()
            .collect();
        self
    }

    /// `host:port` form suitable for socket connects.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.check.port)
    }
}
