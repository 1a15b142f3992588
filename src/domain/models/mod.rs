pub mod check;
pub mod config;
pub mod credential;
pub mod round;
pub mod score_log;
pub mod settings;
pub mod team;

pub use check::{CheckDefinition, CheckTarget};
pub use config::{
    CheckSeed, Config, CredentialSeed, DatabaseConfig, EngineConfig, LogFormat, LoggingConfig,
    RotationPolicy, SeedConfig, TeamSeed, WatcherConfig,
};
pub use credential::Credential;
pub use round::{CheckResult, NewResult, Round, RoundId};
pub use score_log::ScoreLogEntry;
pub use settings::Settings;
pub use team::Team;
