//! Credential descriptors as stored on a directory principal

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::core::IdentifierError;

/// Identifier of one credential within a principal.
///
/// Directory key IDs are UUIDs and are compared on their value, so textual
/// case never matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(Uuid);

impl KeyId {
    /// Wrap an existing UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh client-assigned key ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for KeyId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| IdentifierError::new(s, format!("key ID is not a UUID: {e}")))
    }
}

impl From<Uuid> for KeyId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Type of a credential as the directory reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCredentialType {
    /// X.509 certificate, public key only
    #[default]
    AsymmetricX509Cert,
    /// X.509 certificate with private key and password
    X509CertAndPassword,
    /// Symmetric key
    Symmetric,
    /// Password (client secret)
    Password,
}

impl KeyCredentialType {
    /// Collection on the principal this type lives in.
    pub const fn kind(&self) -> CredentialKind {
        match self {
            Self::AsymmetricX509Cert | Self::X509CertAndPassword | Self::Symmetric => {
                CredentialKind::Certificate
            }
            Self::Password => CredentialKind::Password,
        }
    }

    /// Wire name of the type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AsymmetricX509Cert => "AsymmetricX509Cert",
            Self::X509CertAndPassword => "X509CertAndPassword",
            Self::Symmetric => "Symmetric",
            Self::Password => "Password",
        }
    }
}

impl fmt::Display for KeyCredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyCredentialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AsymmetricX509Cert" => Ok(Self::AsymmetricX509Cert),
            "X509CertAndPassword" => Ok(Self::X509CertAndPassword),
            "Symmetric" => Ok(Self::Symmetric),
            "Password" => Ok(Self::Password),
            other => Err(format!(
                "unknown credential type `{other}`, expected one of \
                 AsymmetricX509Cert, X509CertAndPassword, Symmetric, Password"
            )),
        }
    }
}

/// Credential collection on a principal: key credentials or password credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    /// Certificates and symmetric keys
    Certificate,
    /// Client secrets
    Password,
}

impl CredentialKind {
    /// Segment used in resource identifiers.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Certificate => "certificate",
            Self::Password => "password",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialKind {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "certificate" => Ok(Self::Certificate),
            "password" => Ok(Self::Password),
            other => Err(IdentifierError::new(
                other,
                "credential kind must be `certificate` or `password`",
            )),
        }
    }
}

/// Raw credential material. Zeroed on drop, redacted in `Debug`.
#[derive(Clone)]
pub struct SecretValue(Zeroizing<Vec<u8>>);

impl SecretValue {
    /// Take ownership of raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Borrow the raw bytes.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue([REDACTED; {} bytes])", self.0.len())
    }
}

impl PartialEq for SecretValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice().ct_eq(other.0.as_slice()).into()
    }
}

impl Eq for SecretValue {}

/// One credential on a principal.
///
/// `raw_value` is write-only: it is sent to the directory when the
/// credential is added and never comes back, so descriptors read from a
/// directory always carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    /// Unique within the principal
    pub key_id: KeyId,

    /// Credential type
    pub credential_type: KeyCredentialType,

    /// Friendly label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Start of validity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// End of validity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Credential material, write-only
    #[serde(skip)]
    pub raw_value: Option<SecretValue>,
}

impl CredentialDescriptor {
    /// Create a descriptor valid from now, with no end time and no value.
    pub fn new(key_id: KeyId, credential_type: KeyCredentialType) -> Self {
        Self {
            key_id,
            credential_type,
            display_name: None,
            start_time: Some(Utc::now()),
            end_time: None,
            raw_value: None,
        }
    }

    /// Set the start of validity.
    pub fn with_start_time(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Set the end of validity.
    pub fn with_end_time(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    /// Attach credential material.
    pub fn with_value(mut self, value: SecretValue) -> Self {
        self.raw_value = Some(value);
        self
    }

    /// Set a friendly label.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Collection this descriptor belongs to.
    pub const fn kind(&self) -> CredentialKind {
        self.credential_type.kind()
    }

    /// Copy without the credential material, as a directory would return it.
    pub fn redacted(&self) -> Self {
        Self {
            raw_value: None,
            ..self.clone()
        }
    }
}
