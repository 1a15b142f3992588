//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON log formatting
//! - Rolling file output via tracing-appender

pub mod logger;

pub use logger::{LoggerImpl, LOG_FILE_NAME};
