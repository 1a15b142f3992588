//! SLA violation accounting.
//!
//! A violation is one run of `threshold` consecutive failing results for a
//! single check. Runs do not overlap: once a run is counted the streak starts
//! over, so 12 straight failures at a threshold of 6 are two violations and
//! 7 straight failures are one. A passing result resets the streak.
//!
//! Totals are always recomputed from the full result history and overwrite
//! the stored value, so running the calculator again is harmless.

use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CheckDefinition, Team};
use crate::domain::ports::ResultStore;

/// Count violations in one check's outcomes, oldest first.
pub fn count_violations<I>(outcomes: I, threshold: u32) -> i64
where
    I: IntoIterator<Item = bool>,
{
    let threshold = threshold.max(1);
    let mut streak = 0u32;
    let mut violations = 0i64;

    for passed in outcomes {
        if passed {
            streak = 0;
            continue;
        }
        streak += 1;
        if streak >= threshold {
            violations += 1;
            streak = 0;
        }
    }
    violations
}

/// Outcome of one full recomputation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlaReport {
    pub teams_updated: usize,
    pub teams_failed: usize,
}

pub struct SlaCalculator {
    store: Arc<dyn ResultStore>,
}

impl SlaCalculator {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    /// Recompute and persist one team's violation total.
    pub async fn recalculate_team(
        &self,
        team: &Team,
        checks: &[CheckDefinition],
        threshold: u32,
    ) -> DomainResult<i64> {
        let mut total = 0;
        for check in checks {
            let results = self.store.list_results(team.id, check.id).await?;
            total += count_violations(results.iter().map(|r| r.outcome), threshold);
        }
        self.store.set_sla_violations(team.id, total).await?;
        Ok(total)
    }

    /// Recompute every team. A failure for one team is logged and does not
    /// stop the others.
    pub async fn recalculate_all(&self, threshold: u32) -> DomainResult<SlaReport> {
        let teams = self.store.list_teams().await?;
        let checks = self.store.list_checks().await?;
        let mut report = SlaReport::default();

        for team in &teams {
            tracing::info!(team_num = team.team_num, team = %team.name, "calculating SLAs");
            match self.recalculate_team(team, &checks, threshold).await {
                Ok(violations) => {
                    if violations != team.sla_violations {
                        tracing::info!(
                            team_num = team.team_num,
                            previous = team.sla_violations,
                            violations,
                            "SLA violations changed"
                        );
                    }
                    report.teams_updated += 1;
                }
                Err(e) => {
                    tracing::error!(team_num = team.team_num, error = %e, "SLA recomputation failed");
                    report.teams_failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const F: bool = false;
    const P: bool = true;

    #[test]
    fn test_seven_failures_is_one_violation() {
        assert_eq!(count_violations([F; 7], 6), 1);
    }

    #[test]
    fn test_twelve_failures_is_two_violations() {
        assert_eq!(count_violations([F; 12], 6), 2);
    }

    #[test]
    fn test_pass_resets_streak() {
        let outcomes = [F, F, F, F, F, P, F, F, F, F, F, F];
        assert_eq!(count_violations(outcomes, 6), 1);
    }

    #[test]
    fn test_short_runs_never_count() {
        let outcomes = [F, F, F, F, F, P, F, F, F, F, F, P, F];
        assert_eq!(count_violations(outcomes, 6), 0);
    }

    #[test]
    fn test_zero_threshold_behaves_like_one() {
        assert_eq!(count_violations([F, P, F], 0), 2);
    }

    /// Reference: sum over maximal failing runs of floor(len / threshold).
    fn reference(outcomes: &[bool], threshold: u32) -> i64 {
        outcomes
            .split(|passed| *passed)
            .map(|run| (run.len() / threshold as usize) as i64)
            .sum()
    }

    proptest! {
        #[test]
        fn prop_matches_disjoint_run_count(
            outcomes in proptest::collection::vec(any::<bool>(), 0..200),
            threshold in 1u32..10,
        ) {
            prop_assert_eq!(count_violations(outcomes.iter().copied(), threshold), reference(&outcomes, threshold));
        }
    }
}
