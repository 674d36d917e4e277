//! Logger configuration

mod presets;

use std::fmt;
use std::str::FromStr;

use crate::core::LogError;

/// Variable holding the filter directive
pub const LOG_VAR: &str = "KEYWARD_LOG";

/// Fallback filter variable
pub const RUST_LOG_VAR: &str = "RUST_LOG";

/// Variable selecting the output format
pub const LOG_FORMAT_VAR: &str = "KEYWARD_LOG_FORMAT";

/// Set during acceptance runs; silences all output
pub const ACCEPTANCE_VAR: &str = "KEYWARD_ACC";

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Single-line human-readable output
    #[default]
    Compact,
    /// Multi-line human-readable output
    Pretty,
    /// Newline-delimited JSON
    Json,
}

impl Format {
    /// Lowercase name as accepted by [`FromStr`]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(LogError::Config(format!("unknown log format {other:?}"))),
        }
    }
}

/// Where formatted events go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Writer {
    /// Standard error
    #[default]
    Stderr,
    /// Standard output
    Stdout,
    /// libtest's captured output
    Test,
}

/// Display options for the human-readable formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    /// ANSI colors
    pub colors: bool,
    /// Event target (module path)
    pub target: bool,
    /// Source file and line
    pub source: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            colors: true,
            target: true,
            source: false,
        }
    }
}

/// Logger configuration
///
/// Nothing is installed unless `enabled` is set; [`Config::from_env`] only
/// enables output when a filter directive is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Install a subscriber at all
    pub enabled: bool,
    /// `EnvFilter` directive, e.g. `info,keyward_credential=debug`
    pub level: String,
    /// Output format
    pub format: Format,
    /// Output destination
    pub writer: Writer,
    /// Display options
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_owned(),
            format: Format::default(),
            writer: Writer::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Config {
    /// Enabled configuration with the given filter directive
    pub fn with_level(level: impl Into<String>) -> Self {
        Self {
            enabled: true,
            level: level.into(),
            ..Self::default()
        }
    }

    /// Set the output format
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Set the output destination
    pub fn writer(mut self, writer: Writer) -> Self {
        self.writer = writer;
        self
    }
}
