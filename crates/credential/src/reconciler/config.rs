//! Configuration types for the credential reconciler

use std::time::Duration;

use keyward_resilience::{ConfigError, ConfigResult, PollSettings};
use serde::{Deserialize, Serialize};

/// Default limit for each operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Configuration for the credential reconciler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Confirmation polling after each write
    pub poll: PollSettings,

    /// Limit for attach, lock wait and confirmation included
    #[serde(with = "humantime_serde")]
    pub create_timeout: Duration,

    /// Limit for read
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Limit for detach, lock wait and confirmation included
    #[serde(with = "humantime_serde")]
    pub delete_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll: PollSettings::default(),
            create_timeout: DEFAULT_OPERATION_TIMEOUT,
            read_timeout: DEFAULT_OPERATION_TIMEOUT,
            delete_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl ReconcilerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, timeout) in [
            ("create_timeout", self.create_timeout),
            ("read_timeout", self.read_timeout),
            ("delete_timeout", self.delete_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ConfigError::validation(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        self.poll.validate()
    }
}
