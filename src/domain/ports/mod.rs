//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - ResultStore: persistence for rounds, results, teams and settings
//! - CheckCapability: the opaque service check
//! - CredentialRefresher / CredentialSource: credential state

pub mod check;
pub mod credentials;
pub mod result_store;

pub use check::CheckCapability;
pub use credentials::{CredentialRefresher, CredentialSource};
pub use result_store::ResultStore;
