//! Directory client seam
//!
//! The reconciler never speaks HTTP. It reads and replaces credential
//! collections through [`DirectoryClient`], which a transport crate
//! implements for the real directory. [`InMemoryDirectory`] implements it
//! for local runs and tests, including the read lag of a replicated store.

mod memory;

pub use memory::InMemoryDirectory;

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{CredentialKind, PrincipalId, PrincipalKind};
use crate::set::CredentialSet;

/// A principal as the directory returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    /// Directory object ID
    pub id: PrincipalId,
    /// Kind of directory object
    pub kind: PrincipalKind,
    /// Certificates and symmetric keys
    #[serde(default)]
    pub key_credentials: CredentialSet,
    /// Client secrets
    #[serde(default)]
    pub password_credentials: CredentialSet,
}

impl PrincipalRecord {
    /// Principal with no credentials.
    pub fn new(id: PrincipalId, kind: PrincipalKind) -> Self {
        Self {
            id,
            kind,
            key_credentials: CredentialSet::new(),
            password_credentials: CredentialSet::new(),
        }
    }

    /// Collection of the given kind.
    pub fn credentials(&self, kind: CredentialKind) -> &CredentialSet {
        match kind {
            CredentialKind::Certificate => &self.key_credentials,
            CredentialKind::Password => &self.password_credentials,
        }
    }

    /// Replace the collection of the given kind.
    pub fn set_credentials(&mut self, kind: CredentialKind, set: CredentialSet) {
        match kind {
            CredentialKind::Certificate => self.key_credentials = set,
            CredentialKind::Password => self.password_credentials = set,
        }
    }
}

/// Failure reported by a directory client.
///
/// Opaque to the reconciler: it is wrapped with operation context and handed
/// back to the caller unchanged.
#[derive(Debug)]
pub struct DirectoryError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
    retryable: bool,
}

impl DirectoryError {
    /// Error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            retryable: false,
        }
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Mark the failure as worth retrying later (throttling, 5xx).
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// Error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the client considers the failure transient.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for DirectoryError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

/// Access to principals in the remote directory.
///
/// Reads may lag writes: a successful `replace_credentials` is not
/// guaranteed to show up in the next `get_principal`.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Fetch a principal. `Ok(None)` when it does not exist.
    async fn get_principal(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<PrincipalRecord>, DirectoryError>;

    /// Replace one credential collection of a principal wholesale.
    async fn replace_credentials(
        &self,
        principal: &PrincipalId,
        kind: CredentialKind,
        credentials: &CredentialSet,
    ) -> Result<(), DirectoryError>;
}
