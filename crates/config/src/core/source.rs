//! Configuration source definitions

use std::fmt;
use std::path::PathBuf;

/// Where a layer of configuration came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigSource {
    /// Built-in defaults
    Default,

    /// TOML configuration file
    File(PathBuf),

    /// Environment variables with prefix
    EnvWithPrefix(String),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("defaults"),
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::EnvWithPrefix(prefix) => write!(f, "environment ({prefix}*)"),
        }
    }
}
