//! Check capability adapters.

pub mod tcp;

pub use tcp::TcpCheck;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::models::check::DEFAULT_CHECK_KIND;
use crate::domain::models::CheckTarget;
use crate::domain::ports::CheckCapability;

/// Dispatches each target to the capability registered for its check kind.
#[derive(Default)]
pub struct CheckRegistry {
    checks: HashMap<String, Arc<dyn CheckCapability>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in checks.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_CHECK_KIND, Arc::new(TcpCheck::default()));
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, check: Arc<dyn CheckCapability>) {
        self.checks.insert(kind.into(), check);
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.checks.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

#[async_trait]
impl CheckCapability for CheckRegistry {
    async fn evaluate(&self, target: &CheckTarget) -> bool {
        match self.checks.get(&target.check.kind) {
            Some(check) => check.evaluate(target).await,
            None => {
                tracing::warn!(
                    check = %target.check.name,
                    kind = %target.check.kind,
                    "no check registered for kind, recording failure"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CheckDefinition, Team};

    struct Always(bool);

    #[async_trait]
    impl CheckCapability for Always {
        async fn evaluate(&self, _target: &CheckTarget) -> bool {
            self.0
        }
    }

    fn target(kind: &str) -> CheckTarget {
        let team = Team {
            id: 1,
            name: "alpha".into(),
            team_num: 1,
            service_points: 0,
            sla_violations: 0,
            inject_points: 0,
            redteam_points: 0,
            ir_points: 0,
        };
        let check = CheckDefinition {
            id: 1,
            name: "svc".into(),
            system: "box".into(),
            host: "localhost".into(),
            port: 1,
            kind: kind.into(),
            points: 1,
        };
        CheckTarget::new(team, check)
    }

    #[tokio::test]
    async fn test_dispatches_by_kind() {
        let mut registry = CheckRegistry::new();
        registry.register("up", Arc::new(Always(true)));
        registry.register("down", Arc::new(Always(false)));

        assert!(registry.evaluate(&target("up")).await);
        assert!(!registry.evaluate(&target("down")).await);
        assert_eq!(registry.kinds(), vec!["down", "up"]);
    }

    #[tokio::test]
    async fn test_unknown_kind_fails() {
        let registry = CheckRegistry::with_builtin();
        assert!(!registry.evaluate(&target("smtp")).await);
    }
}
