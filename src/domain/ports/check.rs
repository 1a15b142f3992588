//! Check capability port.

use async_trait::async_trait;

use crate::domain::models::CheckTarget;

/// Evaluates one team's instance of a service.
///
/// Implementations live outside the core. They must not fail: any check
/// error is reported as `false`. The orchestrator additionally bounds each
/// call with the configured check timeout.
#[async_trait]
pub trait CheckCapability: Send + Sync {
    async fn evaluate(&self, target: &CheckTarget) -> bool;
}
