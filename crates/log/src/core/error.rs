//! Logger error types

use thiserror::Error;

/// Logger error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// The filter directive could not be parsed
    #[error("Invalid log filter {0}")]
    Filter(String),

    /// Configuration value out of range
    #[error("Invalid logger configuration: {0}")]
    Config(String),
}

/// Result type for logger operations
pub type LogResult<T> = Result<T, LogError>;
