//! Repository port for rounds, results, teams, score logs and settings.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    CheckDefinition, CheckResult, NewResult, Round, RoundId, ScoreLogEntry, Settings, Team,
};

/// Persistence contract consumed by the orchestrator and the SLA calculator.
///
/// Every write touches a single row, so implementations only need atomic
/// single-row writes; concurrent writers on different teams or checks never
/// contend.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Allocate a new round. Identifiers are strictly increasing.
    async fn open_round(&self) -> DomainResult<Round>;

    /// Append one result. Each (round, team, check) may be recorded once.
    async fn append_result(&self, result: &NewResult) -> DomainResult<CheckResult>;

    /// Results for one team's check, ascending by time.
    async fn list_results(&self, team_id: i64, check_id: i64) -> DomainResult<Vec<CheckResult>>;

    /// All results recorded in a round.
    async fn list_round_results(&self, round_id: RoundId) -> DomainResult<Vec<CheckResult>>;

    /// Overwrite a team's SLA violation total.
    async fn set_sla_violations(&self, team_id: i64, count: i64) -> DomainResult<()>;

    /// Award service points to a team.
    async fn add_service_points(&self, team_id: i64, points: i64) -> DomainResult<()>;

    /// Append a score snapshot row.
    async fn append_score_log(&self, entry: &ScoreLogEntry) -> DomainResult<()>;

    /// Score snapshots for a team, oldest first.
    async fn list_score_log(&self, team_id: i64) -> DomainResult<Vec<ScoreLogEntry>>;

    /// Read a fresh settings snapshot.
    async fn get_settings(&self) -> DomainResult<Settings>;

    /// Set the `running` flag.
    async fn set_running(&self, running: bool) -> DomainResult<()>;

    /// All teams, ordered by id.
    async fn list_teams(&self) -> DomainResult<Vec<Team>>;

    /// All check definitions.
    async fn list_checks(&self) -> DomainResult<Vec<CheckDefinition>>;
}
