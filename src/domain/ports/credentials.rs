//! Credential ports.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Credential;

/// Collaborator invoked once per round to refresh credential state.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// Reload the credentials checks authenticate with. Idempotent.
    async fn reload_credentials(&self) -> DomainResult<()>;

    /// Credentials as of the last reload, handed to checks with their target.
    async fn current_credentials(&self) -> Vec<Credential>;

    /// Persist, per team, the fraction of credentials still at default.
    async fn log_default_credential_fraction(&self) -> DomainResult<()>;
}

/// Read access to the current credential set.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn list_credentials(&self) -> DomainResult<Vec<Credential>>;
}
