//! Provider configuration
//!
//! Layers, lowest first: built-in defaults, an optional TOML file, then
//! `KEYWARD_*` environment variables. The merged result is validated once
//! and is immutable afterwards.

use std::fmt;
use std::path::{Path, PathBuf};

use keyward_credential::ReconcilerConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{ConfigError, ConfigResult, ConfigSource};
use crate::loaders::{EnvLoader, FileLoader};

/// Provider configuration
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Directory tenant
    pub tenant_id: Option<String>,

    /// Application (client) ID
    pub client_id: Option<String>,

    /// File holding the client ID
    pub client_id_file_path: Option<PathBuf>,

    /// Client secret
    pub client_secret: Option<String>,

    /// File holding the client secret
    pub client_secret_file_path: Option<PathBuf>,

    /// Base64 PKCS#12 client certificate
    pub client_certificate: Option<String>,

    /// OIDC ID token for federated authentication
    pub oidc_token: Option<String>,

    /// File holding the OIDC ID token
    pub oidc_token_file_path: Option<PathBuf>,

    /// Take the tenant from AKS workload identity (`AZURE_TENANT_ID`)
    pub use_aks_workload_identity: bool,

    /// Reconciler tuning
    pub reconciler: ReconcilerConfig,

    /// Layers that contributed, lowest first
    #[serde(skip)]
    pub sources: Vec<ConfigSource>,
}

impl ProviderConfig {
    /// Load defaults, then `path` if given, then the process environment,
    /// and validate the result.
    pub async fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => FileLoader::new().load(path).await?,
            None => Self::default(),
        };
        config.sources.insert(0, ConfigSource::Default);
        EnvLoader::new().apply(&mut config)?;
        config.validate()?;

        info!(
            sources = ?config.sources.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Provider configuration loaded"
        );
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::parse("<inline>", e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.reconciler
            .validate()
            .map_err(|e| ConfigError::validation(e.to_string(), Some("reconciler".to_owned())))
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ProviderConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_id_file_path", &self.client_id_file_path)
            .field("client_secret", &redact(&self.client_secret))
            .field("client_secret_file_path", &self.client_secret_file_path)
            .field("client_certificate", &redact(&self.client_certificate))
            .field("oidc_token", &redact(&self.oidc_token))
            .field("oidc_token_file_path", &self.oidc_token_file_path)
            .field("use_aks_workload_identity", &self.use_aks_workload_identity)
            .field("reconciler", &self.reconciler)
            .field("sources", &self.sources)
            .finish()
    }
}
