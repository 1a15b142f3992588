//! SQLite database adapters for the scoring engine.

pub mod connection;
pub mod credential_store;
pub mod migrations;
pub mod result_store;
pub mod seed;

pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, PoolConfig};
pub use credential_store::SqliteCredentialStore;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use result_store::SqliteResultStore;
pub use seed::apply_seed;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};

/// Format a timestamp for storage.
///
/// Fixed precision and a `Z` suffix keep lexicographic order equal to
/// chronological order, which `ORDER BY time` relies on.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| DomainError::SerializationError(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
}

pub async fn initialize_database(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, config).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_round_trip_preserves_micros() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            + chrono::Duration::microseconds(42);
        let stored = format_datetime(&dt);
        assert_eq!(stored, "2024-03-09T14:05:07.000042Z");
        assert_eq!(parse_datetime(&stored).unwrap(), dt);
    }

    #[test]
    fn test_formatted_times_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 3, 9, 9, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
        assert!(format_datetime(&early) < format_datetime(&late));
    }
}
