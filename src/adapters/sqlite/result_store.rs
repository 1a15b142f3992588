//! SQLite adapter for ResultStore.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::adapters::sqlite::{format_datetime, parse_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::settings::KEY_RUNNING;
use crate::domain::models::{
    CheckDefinition, CheckResult, CheckSeed, NewResult, Round, RoundId, ScoreLogEntry, Settings,
    Team, TeamSeed,
};
use crate::domain::ports::ResultStore;

#[derive(Clone)]
pub struct SqliteResultStore {
    pool: SqlitePool,
}

impl SqliteResultStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write a raw setting value.
    pub async fn set_setting(&self, key: &str, value: &str) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO settings (skey, value) VALUES (?1, ?2)
             ON CONFLICT(skey) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Create a team, or update its number if the name already exists.
    pub async fn upsert_team(&self, seed: &TeamSeed) -> DomainResult<Team> {
        sqlx::query(
            "INSERT INTO teams (name, team_num) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET team_num = excluded.team_num",
        )
        .bind(&seed.name)
        .bind(seed.team_num)
        .execute(&self.pool)
        .await?;

        let row: TeamRow = sqlx::query_as("SELECT * FROM teams WHERE name = ?")
            .bind(&seed.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    /// Create a check definition, or update it if the name already exists.
    pub async fn upsert_check(&self, seed: &CheckSeed) -> DomainResult<CheckDefinition> {
        sqlx::query(
            "INSERT INTO checks (name, system, host, port, kind, points)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(name) DO UPDATE SET
               system = excluded.system, host = excluded.host, port = excluded.port,
               kind = excluded.kind, points = excluded.points",
        )
        .bind(&seed.name)
        .bind(&seed.system)
        .bind(&seed.host)
        .bind(i64::from(seed.port))
        .bind(&seed.kind)
        .bind(seed.points)
        .execute(&self.pool)
        .await?;

        let row: CheckRow = sqlx::query_as("SELECT * FROM checks WHERE name = ?")
            .bind(&seed.name)
            .fetch_one(&self.pool)
            .await?;
        row_to_check(row)
    }

    pub async fn get_team(&self, team_id: i64) -> DomainResult<Team> {
        let row: Option<TeamRow> = sqlx::query_as("SELECT * FROM teams WHERE id = ?")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Team::from).ok_or(DomainError::TeamNotFound(team_id))
    }

    /// Number of rounds opened so far.
    pub async fn count_rounds(&self) -> DomainResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM check_rounds")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: i64,
    name: String,
    team_num: i64,
    service_points: i64,
    sla_violations: i64,
    inject_points: i64,
    redteam_points: i64,
    ir_points: i64,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            team_num: row.team_num,
            service_points: row.service_points,
            sla_violations: row.sla_violations,
            inject_points: row.inject_points,
            redteam_points: row.redteam_points,
            ir_points: row.ir_points,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CheckRow {
    id: i64,
    name: String,
    system: String,
    host: String,
    port: i64,
    kind: String,
    points: i64,
}

fn row_to_check(row: CheckRow) -> DomainResult<CheckDefinition> {
    let port = u16::try_from(row.port)
        .map_err(|_| DomainError::SerializationError(format!("check {} has invalid port {}", row.id, row.port)))?;

    Ok(CheckDefinition {
        id: row.id,
        name: row.name,
        system: row.system,
        host: row.host,
        port,
        kind: row.kind,
        points: row.points,
    })
}

#[derive(sqlx::FromRow)]
struct ResultRow {
    id: i64,
    round_id: i64,
    team_id: i64,
    check_id: i64,
    time: String,
    result: bool,
}

fn row_to_result(row: ResultRow) -> DomainResult<CheckResult> {
    Ok(CheckResult {
        id: row.id,
        round_id: RoundId(row.round_id),
        team_id: row.team_id,
        check_id: row.check_id,
        time: parse_datetime(&row.time)?,
        outcome: row.result,
    })
}

#[derive(sqlx::FromRow)]
struct ScoreLogRow {
    team_id: i64,
    time: String,
    service_points: i64,
    sla_violations: i64,
    inject_points: i64,
    redteam_points: i64,
    ir_points: i64,
}

fn row_to_score_log(row: ScoreLogRow) -> DomainResult<ScoreLogEntry> {
    Ok(ScoreLogEntry {
        team_id: row.team_id,
        time: parse_datetime(&row.time)?,
        service_points: row.service_points,
        sla_violations: row.sla_violations,
        inject_points: row.inject_points,
        redteam_points: row.redteam_points,
        ir_points: row.ir_points,
    })
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn open_round(&self) -> DomainResult<Round> {
        let started_at = Utc::now();
        let done = sqlx::query("INSERT INTO check_rounds (started_at) VALUES (?)")
            .bind(format_datetime(&started_at))
            .execute(&self.pool)
            .await?;

        Ok(Round {
            id: RoundId(done.last_insert_rowid()),
            started_at,
        })
    }

    async fn append_result(&self, result: &NewResult) -> DomainResult<CheckResult> {
        let done = sqlx::query(
            "INSERT INTO results (round_id, team_id, check_id, time, result)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(result.round_id.0)
        .bind(result.team_id)
        .bind(result.check_id)
        .bind(format_datetime(&result.time))
        .bind(result.outcome)
        .execute(&self.pool)
        .await?;

        Ok(CheckResult {
            id: done.last_insert_rowid(),
            round_id: result.round_id,
            team_id: result.team_id,
            check_id: result.check_id,
            time: result.time,
            outcome: result.outcome,
        })
    }

    async fn list_results(&self, team_id: i64, check_id: i64) -> DomainResult<Vec<CheckResult>> {
        let rows: Vec<ResultRow> = sqlx::query_as(
            "SELECT id, round_id, team_id, check_id, time, result FROM results
             WHERE team_id = ?1 AND check_id = ?2
             ORDER BY time ASC, id ASC",
        )
        .bind(team_id)
        .bind(check_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_result).collect()
    }

    async fn list_round_results(&self, round_id: RoundId) -> DomainResult<Vec<CheckResult>> {
        let rows: Vec<ResultRow> = sqlx::query_as(
            "SELECT id, round_id, team_id, check_id, time, result FROM results
             WHERE round_id = ? ORDER BY id ASC",
        )
        .bind(round_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_result).collect()
    }

    async fn set_sla_violations(&self, team_id: i64, count: i64) -> DomainResult<()> {
        let done = sqlx::query("UPDATE teams SET sla_violations = ? WHERE id = ?")
            .bind(count)
            .bind(team_id)
            .execute(&self.pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(DomainError::TeamNotFound(team_id));
        }
        Ok(())
    }

    async fn add_service_points(&self, team_id: i64, points: i64) -> DomainResult<()> {
        let done = sqlx::query("UPDATE teams SET service_points = service_points + ? WHERE id = ?")
            .bind(points)
            .bind(team_id)
            .execute(&self.pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(DomainError::TeamNotFound(team_id));
        }
        Ok(())
    }

    async fn append_score_log(&self, entry: &ScoreLogEntry) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO score_log
             (team_id, time, service_points, sla_violations, inject_points, redteam_points, ir_points)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(entry.team_id)
        .bind(format_datetime(&entry.time))
        .bind(entry.service_points)
        .bind(entry.sla_violations)
        .bind(entry.inject_points)
        .bind(entry.redteam_points)
        .bind(entry.ir_points)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_score_log(&self, team_id: i64) -> DomainResult<Vec<ScoreLogEntry>> {
        let rows: Vec<ScoreLogRow> = sqlx::query_as(
            "SELECT team_id, time, service_points, sla_violations, inject_points, redteam_points, ir_points
             FROM score_log WHERE team_id = ? ORDER BY time ASC, id ASC",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_score_log).collect()
    }

    async fn get_settings(&self) -> DomainResult<Settings> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT skey, value FROM settings")
            .fetch_all(&self.pool)
            .await?;
        Settings::from_pairs(rows)
    }

    async fn set_running(&self, running: bool) -> DomainResult<()> {
        self.set_setting(KEY_RUNNING, if running { "true" } else { "false" }).await
    }

    async fn list_teams(&self) -> DomainResult<Vec<Team>> {
        let rows: Vec<TeamRow> = sqlx::query_as("SELECT * FROM teams ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Team::from).collect())
    }

    async fn list_checks(&self) -> DomainResult<Vec<CheckDefinition>> {
        let rows: Vec<CheckRow> = sqlx::query_as("SELECT * FROM checks ORDER BY system ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_check).collect()
    }
}
