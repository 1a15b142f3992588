pub mod artifact_watcher;
pub mod cadence;
pub mod check_runner;
pub mod round_orchestrator;
pub mod sla_calculator;

pub use artifact_watcher::{ArtifactWatcher, WatcherHandle, WatcherPass, WatcherStatus};
pub use cadence::{compute_wait, sla_delay, Cadence};
pub use check_runner::{CheckRunner, FanOutReport};
pub use round_orchestrator::{OrchestratorConfig, RoundOrchestrator, RoundReport, RunSummary, TeamScope};
pub use sla_calculator::{count_violations, SlaCalculator, SlaReport};
