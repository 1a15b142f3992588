//! Command-line entry point and process bootstrap.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use crate::adapters::checks::CheckRegistry;
use crate::adapters::sqlite::{apply_seed, initialize_database, PoolConfig, SqliteCredentialStore, SqliteResultStore};
use crate::domain::models::Config;
use crate::domain::ports::ResultStore;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::LoggerImpl;
use crate::services::{ArtifactWatcher, OrchestratorConfig, RoundOrchestrator, RunSummary, TeamScope};

#[derive(Parser, Debug)]
#[command(name = "scoring-engine")]
#[command(about = "Scoring engine for cyber-defense competitions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Only check this team (1-based, in team name order)
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub team: Option<u32>,

    /// Path to a YAML config file (defaults to ./scoring.yaml when present)
    #[arg(short, long, env = "SCORING_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database URL or path, overriding the config file
    #[arg(long)]
    pub database: Option<String>,
}

impl Cli {
    pub fn scope(&self) -> TeamScope {
        TeamScope::from_team_number(self.team.map(|n| n as usize))
    }
}

/// Load config, apply command-line overrides and install the logger.
///
/// The returned logger must outlive the engine.
pub fn bootstrap(cli: &Cli) -> Result<(Config, LoggerImpl)> {
    let mut config = ConfigLoader::load(cli.config.as_deref())?;
    if let Some(ref database) = cli.database {
        config.database.path.clone_from(database);
        ConfigLoader::validate(&config)?;
    }

    let logger = LoggerImpl::init(&config.logging)?;
    Ok((config, logger))
}

/// Run the engine until an operator clears the `running` setting.
pub async fn run(cli: Cli, config: Config) -> Result<RunSummary> {
    let pool_config = PoolConfig {
        max_connections: config.database.max_connections,
        ..PoolConfig::default()
    };
    let pool = initialize_database(&config.database.path, Some(pool_config))
        .await
        .with_context(|| format!("failed to open database {}", config.database.path))?;

    let results = Arc::new(SqliteResultStore::new(pool.clone()));
    let credentials = Arc::new(SqliteCredentialStore::new(pool));

    apply_seed(&results, &credentials, &config.seed)
        .await
        .context("failed to apply seed configuration")?;
    results.set_running(true).await.context("failed to set running flag")?;

    let watcher = config.watcher.enabled.then(|| {
        ArtifactWatcher::new(
            results.clone(),
            credentials.clone(),
            config.watcher.artifact_dir.clone(),
            Duration::from_secs(config.watcher.interval_secs),
        )
    });
    let watcher_handle = watcher.as_ref().map(ArtifactWatcher::handle);
    let watcher_task = watcher.map(ArtifactWatcher::spawn);

    let scope = cli.scope();
    let registry = CheckRegistry::with_builtin();
    tracing::info!(?scope, database = %config.database.path, check_kinds = ?registry.kinds(), "scoring engine starting");

    let mut orchestrator = RoundOrchestrator::new(
        results,
        credentials,
        Arc::new(registry),
        OrchestratorConfig {
            scope,
            sla_margin: Duration::from_secs(config.engine.sla_margin_secs),
            max_concurrent_checks: config.engine.max_concurrent_checks,
            ..OrchestratorConfig::default()
        },
    );
    let summary = orchestrator.run().await;

    if let (Some(handle), Some(task)) = (watcher_handle, watcher_task) {
        handle.stop();
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "artifact watcher did not shut down cleanly");
        }
    }

    tracing::info!(
        rounds_completed = summary.rounds_completed,
        rounds_skipped = summary.rounds_skipped,
        "scoring engine stopped"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_team_checks_everyone() {
        let cli = Cli::try_parse_from(["scoring-engine"]).unwrap();
        assert_eq!(cli.scope(), TeamScope::All);
    }

    #[test]
    fn test_team_number_is_one_based() {
        let cli = Cli::try_parse_from(["scoring-engine", "2"]).unwrap();
        assert_eq!(cli.scope(), TeamScope::Single(1));
    }

    #[test]
    fn test_team_zero_is_rejected() {
        assert!(Cli::try_parse_from(["scoring-engine", "0"]).is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from(["scoring-engine", "--config", "a.yaml", "--database", "sqlite::memory:"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("a.yaml")));
        assert_eq!(cli.database.as_deref(), Some("sqlite::memory:"));
        assert!(cli.team.is_none());
    }
}
