//! SQLite adapter for credential state.
//!
//! Keeps an in-memory copy of the credential table that check
//! implementations read from; `reload_credentials` refreshes it once per
//! round.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::adapters::sqlite::format_datetime;
use crate::domain::errors::DomainResult;
use crate::domain::models::credential::default_fraction;
use crate::domain::models::Credential;
use crate::domain::ports::{CredentialRefresher, CredentialSource};

#[derive(Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
    cache: Arc<RwLock<Vec<Credential>>>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    team_id: i64,
    check_id: i64,
    username: String,
    password: String,
    is_default: bool,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Self {
            id: row.id,
            team_id: row.team_id,
            check_id: row.check_id,
            username: row.username,
            password: row.password,
            is_default: row.is_default,
        }
    }
}

impl SqliteCredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Add a default credential. Existing (team, check, username) rows are
    /// left alone so a restart never undoes a password change.
    pub async fn add_default_credential(
        &self,
        team_id: i64,
        check_id: i64,
        username: &str,
        password: &str,
    ) -> DomainResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO credentials (team_id, check_id, username, password, is_default)
             VALUES (?1, ?2, ?3, ?4, 1)",
        )
        .bind(team_id)
        .bind(check_id)
        .bind(username)
        .bind(password)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a password change; the credential no longer counts as default.
    pub async fn change_password(&self, credential_id: i64, password: &str) -> DomainResult<()> {
        sqlx::query("UPDATE credentials SET password = ?, is_default = 0 WHERE id = ?")
            .bind(password)
            .bind(credential_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Latest logged default fraction per team.
    pub async fn latest_default_fractions(&self) -> DomainResult<Vec<(i64, f64)>> {
        let rows: Vec<(i64, f64)> = sqlx::query_as(
            "SELECT team_id, perc_default FROM default_creds_log d
             WHERE id = (SELECT MAX(id) FROM default_creds_log WHERE team_id = d.team_id)
             ORDER BY team_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl CredentialSource for SqliteCredentialStore {
    async fn list_credentials(&self) -> DomainResult<Vec<Credential>> {
        let rows: Vec<CredentialRow> = sqlx::query_as(
            "SELECT id, team_id, check_id, username, password, is_default FROM credentials
             ORDER BY team_id ASC, check_id ASC, username ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Credential::from).collect())
    }
}

#[async_trait]
impl CredentialRefresher for SqliteCredentialStore {
    async fn reload_credentials(&self) -> DomainResult<()> {
        let fresh = self.list_credentials().await?;
        let count = fresh.len();
        *self.cache.write().await = fresh;
        tracing::debug!(credentials = count, "reloaded credentials");
        Ok(())
    }

    async fn current_credentials(&self) -> Vec<Credential> {
        self.cache.read().await.clone()
    }

    async fn log_default_credential_fraction(&self) -> DomainResult<()> {
        let mut by_team: BTreeMap<i64, Vec<Credential>> = BTreeMap::new();
        for credential in self.list_credentials().await? {
            by_team.entry(credential.team_id).or_default().push(credential);
        }

        let time = format_datetime(&Utc::now());
        for (team_id, credentials) in by_team {
            let Some(fraction) = default_fraction(&credentials) else {
                continue;
            };
            sqlx::query("INSERT INTO default_creds_log (team_id, time, perc_default) VALUES (?1, ?2, ?3)")
                .bind(team_id)
                .bind(&time)
                .bind(fraction)
                .execute(&self.pool)
                .await?;
            tracing::debug!(team_id, fraction, "logged default credential fraction");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteResultStore};
    use crate::domain::models::{CheckSeed, TeamSeed};

    async fn setup() -> (SqliteCredentialStore, i64, i64) {
        let pool = create_migrated_test_pool().await.unwrap();
        let results = SqliteResultStore::new(pool.clone());
        let team = results
            .upsert_team(&TeamSeed { name: "alpha".into(), team_num: 1 })
            .await
            .unwrap();
        let check = results
            .upsert_check(&CheckSeed {
                name: "ssh".into(),
                system: "jump".into(),
                host: "10.{team_num}.1.2".into(),
                port: 22,
                kind: "tcp".into(),
                points: 1,
                credentials: vec![],
            })
            .await
            .unwrap();
        (SqliteCredentialStore::new(pool), team.id, check.id)
    }

    #[tokio::test]
    async fn test_reload_populates_cache() {
        let (store, team_id, check_id) = setup().await;
        store.add_default_credential(team_id, check_id, "root", "toor").await.unwrap();
        assert!(store.current_credentials().await.is_empty());

        store.reload_credentials().await.unwrap();
        store.reload_credentials().await.unwrap();

        let cached = store.current_credentials().await;
        assert_eq!(cached.len(), 1);
        assert_eq!((cached[0].team_id, cached[0].check_id), (team_id, check_id));
        assert_eq!(cached[0].username, "root");
    }

    #[tokio::test]
    async fn test_default_fraction_logged_per_team() {
        let (store, team_id, check_id) = setup().await;
        store.add_default_credential(team_id, check_id, "root", "toor").await.unwrap();
        store.add_default_credential(team_id, check_id, "admin", "admin").await.unwrap();

        let root = store
            .list_credentials()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.username == "root")
            .unwrap();
        store.change_password(root.id, "s3cret").await.unwrap();

        store.log_default_credential_fraction().await.unwrap();
        let fractions = store.latest_default_fractions().await.unwrap();
        assert_eq!(fractions, vec![(team_id, 0.5)]);
    }

    #[tokio::test]
    async fn test_add_default_credential_does_not_reset_changed_password() {
        let (store, team_id, check_id) = setup().await;
        store.add_default_credential(team_id, check_id, "root", "toor").await.unwrap();
        let id = store.list_credentials().await.unwrap()[0].id;
        store.change_password(id, "rotated").await.unwrap();

        store.add_default_credential(team_id, check_id, "root", "toor").await.unwrap();

        let creds = store.list_credentials().await.unwrap();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].password, "rotated");
        assert!(!creds[0].is_default);
    }
}
