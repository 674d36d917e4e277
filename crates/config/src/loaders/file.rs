//! TOML file configuration loader

use std::path::Path;

use tracing::debug;

use crate::core::{ConfigError, ConfigResult, ConfigSource};
use crate::provider::ProviderConfig;

/// Loads [`ProviderConfig`] from a TOML file
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    _private: (),
}

impl FileLoader {
    /// Create a new file loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse `path`.
    pub async fn load(&self, path: &Path) -> ConfigResult<ProviderConfig> {
        debug!(path = %path.display(), "Loading configuration file");

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::read_file("configuration", path, e.to_string()))?;

        let mut config: ProviderConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::parse(path, format!("TOML parse error: {e}")))?;
        config.sources.push(ConfigSource::File(path.to_path_buf()));
        Ok(config)
    }
}
