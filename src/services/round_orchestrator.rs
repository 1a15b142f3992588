//! Round orchestrator.
//!
//! Drives the evaluation cadence. Each iteration reads a fresh settings
//! snapshot and, while `running` is set, performs in order:
//!
//! 1. default-credential fraction logging
//! 2. a score snapshot per team
//! 3. credential reload, round allocation and the check fan-out
//! 4. scheduling of the deferred SLA recomputation
//!
//! then sleeps `interval ± jitter`. The only way out of the loop is
//! `running = false`; every other failure is logged and the loop carries on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::errors::DomainResult;
use crate::domain::models::team::sort_by_name;
use crate::domain::models::{CheckTarget, RoundId, ScoreLogEntry, Settings, Team};
use crate::domain::ports::{CheckCapability, CredentialRefresher, ResultStore};
use crate::services::cadence::{compute_wait, sla_delay};
use crate::services::check_runner::CheckRunner;
use crate::services::sla_calculator::SlaCalculator;

/// Which teams a round fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamScope {
    All,
    /// Zero-based index into the teams sorted by name.
    Single(usize),
}

impl TeamScope {
    /// Scope for a 1-based team number given on the command line.
    pub fn from_team_number(team_number: Option<usize>) -> Self {
        match team_number {
            Some(n) if n > 0 => Self::Single(n - 1),
            _ => Self::All,
        }
    }

    /// Teams in scope, in name order.
    pub fn select(self, mut teams: Vec<Team>) -> Vec<Team> {
        sort_by_name(&mut teams);
        match self {
            Self::All => teams,
            Self::Single(index) => teams.into_iter().nth(index).into_iter().collect(),
        }
    }
}

/// Orchestrator tuning that is fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub scope: TeamScope,
    /// How long before the next round the SLA recomputation fires.
    pub sla_margin: Duration,
    pub max_concurrent_checks: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scope: TeamScope::All,
            sla_margin: Duration::from_secs(5),
            max_concurrent_checks: 64,
        }
    }
}

/// Summary of one completed round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub round_id: RoundId,
    pub teams: usize,
    pub checks_run: usize,
    pub passed: usize,
    pub failed: usize,
    pub store_errors: usize,
    pub duration: Duration,
}

/// Summary returned when the loop halts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rounds_completed: u64,
    pub rounds_skipped: u64,
}

/// The deferred SLA recomputation for the latest round.
struct PendingSla {
    handle: JoinHandle<()>,
    /// Set once the delay has elapsed and the recomputation has begun.
    fired: Arc<AtomicBool>,
    threshold: u32,
}

pub struct RoundOrchestrator {
    store: Arc<dyn ResultStore>,
    credentials: Arc<dyn CredentialRefresher>,
    runner: CheckRunner,
    sla: Arc<SlaCalculator>,
    config: OrchestratorConfig,
    pending_sla: Option<PendingSla>,
    /// Recomputations that had already started when superseded.
    detached_sla: Vec<JoinHandle<()>>,
    /// Serializes recomputations so the last one to run sees every result.
    sla_lock: Arc<Mutex<()>>,
}

impl RoundOrchestrator {
    pub fn new(
        store: Arc<dyn ResultStore>,
        credentials: Arc<dyn CredentialRefresher>,
        capability: Arc<dyn CheckCapability>,
        config: OrchestratorConfig,
    ) -> Self {
        let runner = CheckRunner::new(capability, store.clone(), config.max_concurrent_checks);
        let sla = Arc::new(SlaCalculator::new(store.clone()));
        Self {
            store,
            credentials,
            runner,
            sla,
            config,
            pending_sla: None,
            detached_sla: Vec::new(),
            sla_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run until the `running` setting is false.
    pub async fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();
        // Interval of the last good settings read, used to pace retries.
        let mut last_interval = Settings::default().interval;

        loop {
            let settings = match self.store.get_settings().await {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::error!(error = %e, retry_in = ?last_interval, "failed to read settings");
                    summary.rounds_skipped += 1;
                    tokio::time::sleep(last_interval).await;
                    continue;
                }
            };
            last_interval = settings.interval;

            if !settings.running {
                tracing::info!("stopped due to 'running' value being false");
                self.finish_pending_sla().await;
                return summary;
            }

            let cadence = compute_wait(settings.interval, settings.jitter, &mut rand::rng());

            match self.run_round(&settings).await {
                Ok(report) => {
                    summary.rounds_completed += 1;
                    self.schedule_sla(cadence.wait, settings.sla_threshold);
                    tracing::info!(
                        round_id = %report.round_id,
                        teams = report.teams,
                        checks = report.checks_run,
                        passed = report.passed,
                        failed = report.failed,
                        store_errors = report.store_errors,
                        duration_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
                        "round complete"
                    );
                }
                Err(e) => {
                    summary.rounds_skipped += 1;
                    tracing::error!(error = %e, retry_in = ?settings.interval, "round skipped, store unavailable");
                    tokio::time::sleep(settings.interval).await;
                    continue;
                }
            }

            let next_round_at = next_round_at(Utc::now(), cadence.wait).map(|at| at.to_rfc3339());
            tracing::info!(
                interval = ?cadence.interval,
                jitter_offset_ms = cadence.jitter_offset_ms,
                wait = ?cadence.wait,
                next_round_at = next_round_at.as_deref(),
                "waiting until next round"
            );
            tokio::time::sleep(cadence.wait).await;
        }
    }

    /// Perform one round with the given settings snapshot.
    pub async fn run_round(&self, settings: &Settings) -> DomainResult<RoundReport> {
        let started = Instant::now();

        if let Err(e) = self.credentials.log_default_credential_fraction().await {
            tracing::warn!(error = %e, "failed to log default credential fraction");
        }

        let teams = self.store.list_teams().await?;
        self.log_scores(&teams).await;

        tracing::info!("spawning new round of checks");
        if let Err(e) = self.credentials.reload_credentials().await {
            tracing::warn!(error = %e, "failed to reload credentials, using previous set");
        }
        let credentials = self.credentials.current_credentials().await;

        let checks = self.store.list_checks().await?;
        let round = self.store.open_round().await?;

        let in_scope = self.config.scope.select(teams);
        if in_scope.is_empty() {
            tracing::warn!(scope = ?self.config.scope, "no teams in scope for this round");
        }

        let credentials = credentials.as_slice();
        let targets: Vec<CheckTarget> = in_scope
            .iter()
            .flat_map(|team| {
                checks.iter().map(move |check| {
                    CheckTarget::new(team.clone(), check.clone()).with_credentials(credentials)
                })
            })
            .collect();

        tracing::info!(round_id = %round.id, targets = targets.len(), "round started");
        let fan_out = self.runner.run(&round, targets, settings.check_timeout).await;

        Ok(RoundReport {
            round_id: round.id,
            teams: in_scope.len(),
            checks_run: fan_out.checks_run,
            passed: fan_out.passed,
            failed: fan_out.failed,
            store_errors: fan_out.store_errors,
            duration: started.elapsed(),
        })
    }

    async fn log_scores(&self, teams: &[Team]) {
        let now = Utc::now();
        for team in teams {
            if let Err(e) = self.store.append_score_log(&ScoreLogEntry::snapshot(team, now)).await {
                tracing::warn!(team_num = team.team_num, error = %e, "failed to log score snapshot");
            }
        }
    }

    /// Schedule the one-shot SLA recomputation `wait - margin` from now.
    fn schedule_sla(&mut self, wait: Duration, threshold: u32) {
        if let Some(previous) = self.pending_sla.take() {
            if previous.fired.load(Ordering::Acquire) {
                self.detached_sla.push(previous.handle);
            } else {
                previous.handle.abort();
                tracing::debug!("superseded pending SLA recomputation");
            }
        }
        self.detached_sla.retain(|handle| !handle.is_finished());

        let delay = sla_delay(wait, self.config.sla_margin);
        let fired = Arc::new(AtomicBool::new(false));
        let calculator = self.sla.clone();
        let lock = self.sla_lock.clone();
        let task_fired = fired.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task_fired.store(true, Ordering::Release);
            let _serial = lock.lock().await;
            run_sla(&calculator, threshold, wait).await;
        });

        self.pending_sla = Some(PendingSla { handle, fired, threshold });
    }

    /// On halt: let a running recomputation finish, or cancel one that has
    /// not fired yet and recompute immediately instead.
    async fn finish_pending_sla(&mut self) {
        for handle in self.detached_sla.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "SLA recomputation task failed");
            }
        }

        let Some(pending) = self.pending_sla.take() else {
            return;
        };

        if pending.fired.load(Ordering::Acquire) {
            if let Err(e) = pending.handle.await {
                tracing::error!(error = %e, "SLA recomputation task failed");
            }
        } else {
            pending.handle.abort();
            tracing::info!("cancelled pending SLA recomputation, running it now");
            let _serial = self.sla_lock.lock().await;
            run_sla(&self.sla, pending.threshold, Duration::ZERO).await;
        }
    }
}

/// Wall-clock time of the next round, if representable.
fn next_round_at(now: DateTime<Utc>, wait: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(wait)
        .ok()
        .and_then(|wait| now.checked_add_signed(wait))
}

async fn run_sla(calculator: &SlaCalculator, threshold: u32, wait: Duration) {
    let started = Instant::now();
    match calculator.recalculate_all(threshold).await {
        Ok(report) => tracing::info!(
            teams_updated = report.teams_updated,
            teams_failed = report.teams_failed,
            threshold,
            cadence = ?wait,
            elapsed = ?started.elapsed(),
            "SLA recomputation complete"
        ),
        Err(e) => tracing::error!(error = %e, "SLA recomputation failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteCredentialStore, SqliteResultStore};
    use crate::domain::models::{CheckSeed, TeamSeed};
    use async_trait::async_trait;

    struct AlwaysFails;

    #[async_trait]
    impl CheckCapability for AlwaysFails {
        async fn evaluate(&self, _target: &CheckTarget) -> bool {
            false
        }
    }

    async fn failing_engine() -> (RoundOrchestrator, Arc<SqliteResultStore>, Team) {
        let pool = create_migrated_test_pool().await.unwrap();
        let store = Arc::new(SqliteResultStore::new(pool.clone()));
        let credentials = Arc::new(SqliteCredentialStore::new(pool));
        let team = store
            .upsert_team(&TeamSeed { name: "alpha".into(), team_num: 1 })
            .await
            .unwrap();
        store
            .upsert_check(&CheckSeed {
                name: "web".into(),
                system: "www".into(),
                host: "10.{team_num}.1.10".into(),
                port: 80,
                kind: "tcp".into(),
                points: 1,
                credentials: vec![],
            })
            .await
            .unwrap();
        let engine = RoundOrchestrator::new(store.clone(), credentials, Arc::new(AlwaysFails), OrchestratorConfig::default());
        (engine, store, team)
    }

    fn team(name: &str) -> Team {
        Team {
            id: name.len() as i64,
            name: name.to_string(),
            team_num: 0,
            service_points: 0,
            sla_violations: 0,
            inject_points: 0,
            redteam_points: 0,
            ir_points: 0,
        }
    }

    #[test]
    fn test_scope_from_team_number() {
        assert_eq!(TeamScope::from_team_number(None), TeamScope::All);
        assert_eq!(TeamScope::from_team_number(Some(2)), TeamScope::Single(1));
        assert_eq!(TeamScope::from_team_number(Some(0)), TeamScope::All);
    }

    #[test]
    fn test_single_scope_selects_by_name_order() {
        let teams = vec![team("gamma"), team("alpha"), team("beta")];
        let selected = TeamScope::Single(1).select(teams);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "beta");
    }

    #[test]
    fn test_single_scope_out_of_range_is_empty() {
        let teams = vec![team("alpha")];
        assert!(TeamScope::Single(4).select(teams).is_empty());
    }

    #[test]
    fn test_next_round_at_overflow_is_none() {
        let now = Utc::now();
        assert_eq!(next_round_at(now, Duration::from_secs(90)), Some(now + chrono::Duration::seconds(90)));
        assert_eq!(next_round_at(now, Duration::from_secs(10_000_000_000_000)), None);
        assert_eq!(next_round_at(now, Duration::MAX), None);
    }

    #[tokio::test]
    async fn test_superseded_sla_is_recomputed_inline_at_halt() {
        let (mut engine, store, team) = failing_engine().await;
        let settings = Settings::default();
        for _ in 0..4 {
            engine.run_round(&settings).await.unwrap();
        }

        // neither delay elapses; the second schedule aborts the first
        engine.schedule_sla(Duration::from_secs(3600), 4);
        engine.schedule_sla(Duration::from_secs(3600), 2);
        assert!(engine.detached_sla.is_empty());
        assert_eq!(store.get_team(team.id).await.unwrap().sla_violations, 0);

        engine.finish_pending_sla().await;

        assert!(engine.pending_sla.is_none());
        // four failures at the latest threshold of two
        assert_eq!(store.get_team(team.id).await.unwrap().sla_violations, 2);
    }
}
