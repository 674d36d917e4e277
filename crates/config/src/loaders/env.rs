//! Environment variable configuration overlay

use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

use crate::core::{ConfigError, ConfigResult, ConfigSource};
use crate::provider::ProviderConfig;

/// Default environment variable prefix
pub const DEFAULT_PREFIX: &str = "KEYWARD_";

/// Overlays `{prefix}*` environment variables onto a [`ProviderConfig`].
///
/// Unset and empty variables leave the existing value alone.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    /// Environment variable prefix
    pub prefix: String,
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_owned(),
        }
    }
}

impl EnvLoader {
    /// Create a new environment loader with the `KEYWARD_` prefix
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new environment loader with prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Overlay the process environment.
    pub fn apply(&self, config: &mut ProviderConfig) -> ConfigResult<()> {
        self.apply_with(config, |name| std::env::var(name).ok())
    }

    /// Overlay variables read through `lookup`.
    pub fn apply_with(
        &self,
        config: &mut ProviderConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        let var = |suffix: &str| -> Option<(String, String)> {
            let name = format!("{}{suffix}", self.prefix);
            let value = lookup(&name).filter(|value| !value.is_empty())?;
            if is_sensitive(suffix) {
                trace!(%name, "Loading env config: [REDACTED]");
            } else {
                trace!(%name, %value, "Loading env config");
            }
            Some((name, value))
        };
        let mut touched = false;

        for (suffix, slot) in [
            ("TENANT_ID", &mut config.tenant_id),
            ("CLIENT_ID", &mut config.client_id),
            ("CLIENT_SECRET", &mut config.client_secret),
            ("CLIENT_CERTIFICATE", &mut config.client_certificate),
            ("OIDC_TOKEN", &mut config.oidc_token),
        ] {
            if let Some((_, value)) = var(suffix) {
                *slot = Some(value);
                touched = true;
            }
        }

        for (suffix, slot) in [
            ("CLIENT_ID_FILE_PATH", &mut config.client_id_file_path),
            ("CLIENT_SECRET_FILE_PATH", &mut config.client_secret_file_path),
            ("OIDC_TOKEN_FILE_PATH", &mut config.oidc_token_file_path),
        ] {
            if let Some((_, value)) = var(suffix) {
                *slot = Some(PathBuf::from(value));
                touched = true;
            }
        }

        if let Some((name, value)) = var("USE_AKS_WORKLOAD_IDENTITY") {
            config.use_aks_workload_identity = parse_bool(&value)
                .ok_or_else(|| ConfigError::env_var_parse(name, value))?;
            touched = true;
        }

        let reconciler = &mut config.reconciler;
        for (suffix, slot) in [
            ("CREATE_TIMEOUT", &mut reconciler.create_timeout),
            ("READ_TIMEOUT", &mut reconciler.read_timeout),
            ("DELETE_TIMEOUT", &mut reconciler.delete_timeout),
            ("POLL_MIN_INTERVAL", &mut reconciler.poll.min_interval),
        ] {
            if let Some((name, value)) = var(suffix) {
                *slot = parse_duration(&name, &value)?;
                touched = true;
            }
        }

        if let Some((name, value)) = var("POLL_CONSECUTIVE_TARGET_HITS") {
            reconciler.poll.consecutive_target_hits = value
                .parse()
                .map_err(|_| ConfigError::env_var_parse(name, value))?;
            touched = true;
        }

        if touched {
            config
                .sources
                .push(ConfigSource::EnvWithPrefix(self.prefix.clone()));
        }
        Ok(())
    }
}

fn is_sensitive(suffix: &str) -> bool {
    suffix.contains("SECRET") || suffix.contains("TOKEN") || suffix.contains("CERTIFICATE")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_duration(name: &str, value: &str) -> ConfigResult<Duration> {
    humantime::parse_duration(value).map_err(|_| ConfigError::env_var_parse(name, value))
}
