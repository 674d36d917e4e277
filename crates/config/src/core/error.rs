//! Configuration error types

use std::path::PathBuf;

use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration or credential file could not be read
    #[error("Failed to read {what} from file {path}: {message}")]
    ReadFile {
        /// What the file was supposed to hold
        what: &'static str,
        /// Offending path
        path: PathBuf,
        /// I/O error text
        message: String,
    },

    /// Configuration file parse error
    #[error("Failed to parse configuration file {path}: {message}")]
    Parse {
        /// Offending path
        path: PathBuf,
        /// Parser complaint
        message: String,
    },

    /// Two sources for one value disagree
    #[error(
        "mismatch between supplied {field} and {other} - please either remove one or ensure they match"
    )]
    Mismatch {
        /// Field with conflicting values
        field: &'static str,
        /// The second source
        other: &'static str,
    },

    /// Client certificate is not valid base64
    #[error("could not decode client certificate data: {message}")]
    InvalidCertificate {
        /// Decoder complaint
        message: String,
    },

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {value:?}")]
    EnvVarParse {
        /// Variable name
        name: String,
        /// Rejected value
        value: String,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    Validation {
        /// What is wrong
        message: String,
        /// Field at fault, if known
        field: Option<String>,
    },
}

impl ConfigError {
    /// Create a file read error
    pub fn read_file(what: &'static str, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ReadFile {
            what,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an environment variable parse error
    pub fn env_var_parse(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::EnvVarParse {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>, field: Option<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field,
        }
    }
}

/// Standard result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
