//! Adapters implementing the domain ports.

pub mod checks;
pub mod sqlite;
