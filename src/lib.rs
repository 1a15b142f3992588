//! Scoring engine for cyber-defense competitions.
//!
//! Repeatedly checks every team's services, records each outcome as an
//! append-only result, awards service points and derives SLA violations from
//! runs of consecutive failures.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): models, errors and the port traits
//! - **Adapters** (`adapters`): `SQLite` persistence and service checks
//! - **Service Layer** (`services`): round orchestration, SLA accounting,
//!   and the credential artifact watcher
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): argument parsing and process bootstrap
//!
//! # Example
//!
//! ```ignore
//! use scoring_engine::cli::{self, Cli};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse();
//!     let (config, _logger) = cli::bootstrap(&cli)?;
//!     cli::run(cli, config).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{CheckDefinition, CheckTarget, Config, Settings, Team};
pub use domain::ports::{CheckCapability, CredentialRefresher, CredentialSource, ResultStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{RoundOrchestrator, SlaCalculator, TeamScope};
