use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use scoring_engine::adapters::sqlite::{SqliteCredentialStore, SqliteResultStore};
use scoring_engine::domain::models::settings::{KEY_INTERVAL, KEY_RUNNING, KEY_SLA_LIMIT};
use scoring_engine::domain::models::{
    CheckDefinition, CheckResult, CheckSeed, CheckTarget, NewResult, Round, RoundId, ScoreLogEntry, Settings, Team,
    TeamSeed,
};
use scoring_engine::{CheckCapability, DomainError, DomainResult, ResultStore};

use super::database::setup_test_db;

/// Stores over one fresh database, with teams and checks already created.
pub struct Arena {
    pub results: Arc<SqliteResultStore>,
    pub credentials: Arc<SqliteCredentialStore>,
    pub teams: Vec<Team>,
    pub checks: Vec<CheckDefinition>,
}

impl Arena {
    /// Teams are numbered 1.. in the given order.
    pub async fn new(team_names: &[&str], check_names: &[&str]) -> Self {
        let pool = setup_test_db().await;
        let results = Arc::new(SqliteResultStore::new(pool.clone()));
        let credentials = Arc::new(SqliteCredentialStore::new(pool));

        let mut teams = Vec::new();
        for (i, name) in team_names.iter().enumerate() {
            let seed = TeamSeed { name: (*name).to_string(), team_num: i as i64 + 1 };
            teams.push(results.upsert_team(&seed).await.expect("failed to create team"));
        }

        let mut checks = Vec::new();
        for (i, name) in check_names.iter().enumerate() {
            let seed = CheckSeed {
                name: (*name).to_string(),
                system: format!("sys{i}"),
                host: "10.{team_num}.1.1".to_string(),
                port: 8000 + i as u16,
                kind: "tcp".to_string(),
                points: 1,
                credentials: vec![],
            };
            checks.push(results.upsert_check(&seed).await.expect("failed to create check"));
        }

        Self { results, credentials, teams, checks }
    }

    /// Turn the engine on with no pause between rounds.
    pub async fn start_fast(&self, sla_limit: u32) {
        self.results.set_setting(KEY_INTERVAL, "0").await.unwrap();
        self.results.set_setting(KEY_SLA_LIMIT, &sla_limit.to_string()).await.unwrap();
        self.results.set_setting(KEY_RUNNING, "true").await.unwrap();
    }
}

/// Fixed outcome for every check; clears `running` once `rounds` full
/// rounds worth of checks have run.
pub struct HaltAfter {
    store: Arc<SqliteResultStore>,
    outcome: bool,
    checks_per_round: usize,
    rounds: usize,
    calls: AtomicUsize,
}

impl HaltAfter {
    pub fn new(store: Arc<SqliteResultStore>, outcome: bool, checks_per_round: usize, rounds: usize) -> Self {
        Self {
            store,
            outcome,
            checks_per_round,
            rounds,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CheckCapability for HaltAfter {
    async fn evaluate(&self, _target: &CheckTarget) -> bool {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if calls == self.checks_per_round * self.rounds {
            self.store.set_setting(KEY_RUNNING, "false").await.expect("failed to halt");
        }
        self.outcome
    }
}

/// Passes only for the listed team numbers.
pub struct PassFor(pub Vec<i64>);

#[async_trait]
impl CheckCapability for PassFor {
    async fn evaluate(&self, target: &CheckTarget) -> bool {
        self.0.contains(&target.team.team_num)
    }
}

/// Passes only when the target carries a credential with this username.
pub struct RequiresUser(pub &'static str);

#[async_trait]
impl CheckCapability for RequiresUser {
    async fn evaluate(&self, target: &CheckTarget) -> bool {
        target.credentials.iter().any(|c| c.username == self.0)
    }
}

/// Delegates to a real store but refuses the first round allocation.
pub struct FlakyStore {
    inner: Arc<SqliteResultStore>,
    failed_once: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteResultStore>) -> Self {
        Self { inner, failed_once: AtomicBool::new(false) }
    }
}

#[async_trait]
impl ResultStore for FlakyStore {
    async fn open_round(&self) -> DomainResult<Round> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("database is locked".to_string()));
        }
        self.inner.open_round().await
    }

    async fn append_result(&self, result: &NewResult) -> DomainResult<CheckResult> {
        self.inner.append_result(result).await
    }

    async fn list_results(&self, team_id: i64, check_id: i64) -> DomainResult<Vec<CheckResult>> {
        self.inner.list_results(team_id, check_id).await
    }

    async fn list_round_results(&self, round_id: RoundId) -> DomainResult<Vec<CheckResult>> {
        self.inner.list_round_results(round_id).await
    }

    async fn set_sla_violations(&self, team_id: i64, count: i64) -> DomainResult<()> {
        self.inner.set_sla_violations(team_id, count).await
    }

    async fn add_service_points(&self, team_id: i64, points: i64) -> DomainResult<()> {
        self.inner.add_service_points(team_id, points).await
    }

    async fn append_score_log(&self, entry: &ScoreLogEntry) -> DomainResult<()> {
        self.inner.append_score_log(entry).await
    }

    async fn list_score_log(&self, team_id: i64) -> DomainResult<Vec<ScoreLogEntry>> {
        self.inner.list_score_log(team_id).await
    }

    async fn get_settings(&self) -> DomainResult<Settings> {
        self.inner.get_settings().await
    }

    async fn set_running(&self, running: bool) -> DomainResult<()> {
        self.inner.set_running(running).await
    }

    async fn list_teams(&self) -> DomainResult<Vec<Team>> {
        self.inner.list_teams().await
    }

    async fn list_checks(&self) -> DomainResult<Vec<CheckDefinition>> {
        self.inner.list_checks().await
    }
}
