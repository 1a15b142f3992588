//! Startup seeding of teams, checks and default credentials.

use crate::adapters::sqlite::{SqliteCredentialStore, SqliteResultStore};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::SeedConfig;

/// Counts of seeded rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub teams: usize,
    pub checks: usize,
    pub credentials: usize,
}

/// Create or update the configured teams and checks, then hand every team
/// the default credentials of every check.
pub async fn apply_seed(
    results: &SqliteResultStore,
    credentials: &SqliteCredentialStore,
    seed: &SeedConfig,
) -> DomainResult<SeedReport> {
    let mut report = SeedReport::default();

    let mut teams = Vec::with_capacity(seed.teams.len());
    for team in &seed.teams {
        if team.name.trim().is_empty() {
            return Err(DomainError::ValidationFailed("team name cannot be empty".to_string()));
        }
        teams.push(results.upsert_team(team).await?);
        report.teams += 1;
    }

    for check_seed in &seed.checks {
        let check = results.upsert_check(check_seed).await?;
        report.checks += 1;

        for team in &teams {
            for credential in &check_seed.credentials {
                credentials
                    .add_default_credential(team.id, check.id, &credential.username, &credential.password)
                    .await?;
                report.credentials += 1;
            }
        }
    }

    tracing::info!(
        teams = report.teams,
        checks = report.checks,
        credentials = report.credentials,
        "applied seed configuration"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{CheckSeed, CredentialSeed, TeamSeed};
    use crate::domain::ports::{CredentialSource, ResultStore};

    fn seed() -> SeedConfig {
        SeedConfig {
            teams: vec![
                TeamSeed { name: "Team 1".into(), team_num: 1 },
                TeamSeed { name: "Team 2".into(), team_num: 2 },
            ],
            checks: vec![CheckSeed {
                name: "ftp".into(),
                system: "files".into(),
                host: "10.{team_num}.1.21".into(),
                port: 21,
                kind: "tcp".into(),
                points: 1,
                credentials: vec![CredentialSeed {
                    username: "anonymous".into(),
                    password: "guest".into(),
                }],
            }],
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let pool = create_migrated_test_pool().await.unwrap();
        let results = SqliteResultStore::new(pool.clone());
        let credentials = SqliteCredentialStore::new(pool);

        apply_seed(&results, &credentials, &seed()).await.unwrap();
        let report = apply_seed(&results, &credentials, &seed()).await.unwrap();

        assert_eq!(report, SeedReport { teams: 2, checks: 1, credentials: 2 });
        assert_eq!(results.list_teams().await.unwrap().len(), 2);
        assert_eq!(results.list_checks().await.unwrap().len(), 1);
        assert_eq!(credentials.list_credentials().await.unwrap().len(), 2);
    }
}
