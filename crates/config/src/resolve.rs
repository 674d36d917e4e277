//! Client credential resolution
//!
//! Several credentials can be given inline, through a file, or both. When
//! both are given they must agree after trimming; a file that cannot be read
//! is an error, never a silent fallback to the inline value.

use std::fmt;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::{ConfigError, ConfigResult};
use crate::provider::ProviderConfig;

/// Environment variable set by AKS workload identity
pub const AKS_TENANT_ID_VAR: &str = "AZURE_TENANT_ID";

/// Credentials ready for an authentication layer.
#[derive(Clone, Default)]
pub struct ResolvedCredentials {
    /// Directory tenant
    pub tenant_id: Option<String>,
    /// Application (client) ID
    pub client_id: Option<String>,
    /// Client secret
    pub client_secret: Option<Zeroizing<String>>,
    /// OIDC ID token
    pub oidc_token: Option<Zeroizing<String>>,
    /// Decoded PKCS#12 client certificate
    pub client_certificate: Option<Zeroizing<Vec<u8>>>,
}

impl fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("oidc_token", &self.oidc_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "client_certificate",
                &self
                    .client_certificate
                    .as_ref()
                    .map(|der| format!("[REDACTED; {} bytes]", der.len())),
            )
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve inline values, files and workload identity into credentials.
    pub async fn resolve(&self) -> ConfigResult<ResolvedCredentials> {
        self.resolve_with(|name| std::env::var(name).ok()).await
    }

    /// [`resolve`](Self::resolve) with environment lookups through `lookup`.
    pub async fn resolve_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<ResolvedCredentials> {
        let client_id = inline_or_file(
            "client_id",
            "Client ID",
            non_empty(self.client_id.as_deref()),
            self.client_id_file_path.as_deref(),
        )
        .await?;

        let client_secret = inline_or_file(
            "client_secret",
            "Client Secret",
            non_empty(self.client_secret.as_deref()),
            self.client_secret_file_path.as_deref(),
        )
        .await?;

        let oidc_token = inline_or_file(
            "oidc_token",
            "OIDC Token",
            // Tokens are compared verbatim
            self.oidc_token.clone().filter(|token| !token.is_empty()),
            self.oidc_token_file_path.as_deref(),
        )
        .await?;

        Ok(ResolvedCredentials {
            tenant_id: self.tenant_id(lookup)?,
            client_id,
            client_secret: client_secret.map(Zeroizing::new),
            oidc_token: oidc_token.map(Zeroizing::new),
            client_certificate: self.decode_certificate()?,
        })
    }

    fn tenant_id(&self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Option<String>> {
        let configured = non_empty(self.tenant_id.as_deref());
        if !self.use_aks_workload_identity {
            return Ok(configured);
        }

        let Some(aks) = lookup(AKS_TENANT_ID_VAR).filter(|value| !value.is_empty()) else {
            return Ok(configured);
        };
        match configured {
            Some(configured) if configured != aks => Err(ConfigError::Mismatch {
                field: "tenant_id",
                other: "the tenant ID provided by AKS Workload Identity",
            }),
            _ => {
                debug!("Using tenant ID from AKS workload identity");
                Ok(Some(aks))
            }
        }
    }

    fn decode_certificate(&self) -> ConfigResult<Option<Zeroizing<Vec<u8>>>> {
        let Some(encoded) = non_empty(self.client_certificate.as_deref()) else {
            return Ok(None);
        };
        STANDARD
            .decode(encoded.as_bytes())
            .map(|der| Some(Zeroizing::new(der)))
            .map_err(|e| ConfigError::InvalidCertificate {
                message: e.to_string(),
            })
    }
}

/// Inline value, replaced by trimmed file contents when a path is set.
async fn inline_or_file(
    field: &'static str,
    what: &'static str,
    inline: Option<String>,
    path: Option<&Path>,
) -> ConfigResult<Option<String>> {
    let Some(path) = path.filter(|path| !path.as_os_str().is_empty()) else {
        return Ok(inline);
    };

    let raw = Zeroizing::new(
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::read_file(what, path, e.to_string()))?,
    );
    let from_file = raw.trim().to_owned();

    if inline.as_deref().is_some_and(|inline| inline != from_file) {
        return Err(ConfigError::Mismatch {
            field,
            other: "file contents",
        });
    }
    debug!(field, path = %path.display(), "Read credential from file");
    Ok(Some(from_file).filter(|value| !value.is_empty()))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
