//! Shared fixtures for integration tests.

pub mod database;
pub mod fixtures;
