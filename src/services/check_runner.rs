//! Concurrent check fan-out for one round.
//!
//! Every (team, check) pair runs as its own task. A check that hangs past the
//! check timeout is aborted and recorded as a failure; a check that panics is
//! recorded as a failure too. A store error for one pair is logged and does
//! not affect the others.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::domain::models::{CheckTarget, NewResult, Round};
use crate::domain::ports::{CheckCapability, ResultStore};

/// Result of checking one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOutcome {
    pub team_id: i64,
    pub check_id: i64,
    pub outcome: bool,
    /// Whether the result row made it into the store.
    pub recorded: bool,
}

/// Aggregate of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub checks_run: usize,
    pub passed: usize,
    pub failed: usize,
    pub store_errors: usize,
}

impl FanOutReport {
    fn record(&mut self, pair: &PairOutcome) {
        self.checks_run += 1;
        if pair.outcome {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        if !pair.recorded {
            self.store_errors += 1;
        }
    }
}

#[derive(Clone)]
pub struct CheckRunner {
    capability: Arc<dyn CheckCapability>,
    store: Arc<dyn ResultStore>,
    permits: Arc<Semaphore>,
}

impl CheckRunner {
    pub fn new(
        capability: Arc<dyn CheckCapability>,
        store: Arc<dyn ResultStore>,
        max_concurrent_checks: usize,
    ) -> Self {
        Self {
            capability,
            store,
            permits: Arc::new(Semaphore::new(max_concurrent_checks.max(1))),
        }
    }

    /// Check every target and persist the outcomes under `round`.
    ///
    /// Returns once every pair has been recorded, so no pair is ever
    /// checked by two rounds at the same time.
    pub async fn run(&self, round: &Round, targets: Vec<CheckTarget>, timeout: Duration) -> FanOutReport {
        let mut tasks = JoinSet::new();

        for target in targets {
            let runner = self.clone();
            let round_id = round.id;
            tasks.spawn(async move {
                let team_id = target.team.id;
                let check_id = target.check.id;
                let points = target.check.points;

                // The semaphore is never closed
                let _permit = runner.permits.clone().acquire_owned().await.ok();
                let outcome = runner.evaluate(target, timeout).await;

                let recorded = runner
                    .record(NewResult {
                        round_id,
                        team_id,
                        check_id,
                        time: Utc::now(),
                        outcome,
                    })
                    .await;

                if outcome && recorded && points != 0 {
                    if let Err(e) = runner.store.add_service_points(team_id, points).await {
                        tracing::error!(team_id, check_id, error = %e, "failed to award service points");
                    }
                }

                PairOutcome { team_id, check_id, outcome, recorded }
            });
        }

        let mut report = FanOutReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => report.record(&pair),
                Err(e) => tracing::error!(error = %e, "check task aborted"),
            }
        }
        report
    }

    async fn evaluate(&self, target: CheckTarget, timeout: Duration) -> bool {
        let capability = self.capability.clone();
        let team_num = target.team.team_num;
        let check = target.check.name.clone();

        let mut task = tokio::spawn(async move { capability.evaluate(&target).await });
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(team_num, %check, error = %e, "check panicked, recording failure");
                false
            }
            Err(_) => {
                task.abort();
                tracing::warn!(team_num, %check, ?timeout, "check timed out, recording failure");
                false
            }
        }
    }

    async fn record(&self, result: NewResult) -> bool {
        match self.store.append_result(&result).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    round_id = %result.round_id,
                    team_id = result.team_id,
                    check_id = result.check_id,
                    error = %e,
                    "failed to record check result"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteResultStore};
    use crate::domain::models::{CheckSeed, TeamSeed};
    use async_trait::async_trait;

    /// Passes for even team numbers, hangs for team 3, panics for team 5.
    struct Scripted;

    #[async_trait]
    impl CheckCapability for Scripted {
        async fn evaluate(&self, target: &CheckTarget) -> bool {
            match target.team.team_num {
                3 => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    true
                }
                5 => panic!("check blew up"),
                n => n % 2 == 0,
            }
        }
    }

    #[tokio::test]
    async fn test_failures_timeouts_and_panics_become_failing_results() {
        let store = Arc::new(SqliteResultStore::new(create_migrated_test_pool().await.unwrap()));
        let check = store
            .upsert_check(&CheckSeed {
                name: "web".into(),
                system: "www".into(),
                host: "10.{team_num}.1.10".into(),
                port: 80,
                kind: "tcp".into(),
                points: 3,
                credentials: vec![],
            })
            .await
            .unwrap();

        let mut targets = Vec::new();
        for n in 1..=6 {
            let team = store
                .upsert_team(&TeamSeed { name: format!("team{n}"), team_num: n })
                .await
                .unwrap();
            targets.push(CheckTarget::new(team, check.clone()));
        }

        let runner = CheckRunner::new(Arc::new(Scripted), store.clone(), 4);
        let round = store.open_round().await.unwrap();
        let report = runner.run(&round, targets, Duration::from_millis(200)).await;

        assert_eq!(report, FanOutReport { checks_run: 6, passed: 3, failed: 3, store_errors: 0 });

        let results = store.list_round_results(round.id).await.unwrap();
        assert_eq!(results.len(), 6);
        assert_eq!(results.iter().filter(|r| r.outcome).count(), 3);

        for team in store.list_teams().await.unwrap() {
            let expected = if team.team_num % 2 == 0 { 3 } else { 0 };
            assert_eq!(team.service_points, expected, "team {}", team.team_num);
        }
    }
}
