//! Directory principals that own credentials

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::IdentifierError;

/// Object ID of a directory principal.
///
/// Parsing accepts any casing and hyphenation `uuid` understands; display is
/// always the lower-case hyphenated form the directory returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    /// Wrap an existing UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a random ID. Mostly useful for tests and local directories.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for PrincipalId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| IdentifierError::new(s, format!("principal ID is not a UUID: {e}")))
    }
}

impl From<Uuid> for PrincipalId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Kind of directory object a credential is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrincipalKind {
    /// An enterprise application instance in a tenant
    ServicePrincipal,
    /// An application registration
    Application,
}

impl PrincipalKind {
    /// Segment used in resource identifiers and lock keys.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ServicePrincipal => "servicePrincipal",
            Self::Application => "application",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalKind {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "servicePrincipal" => Ok(Self::ServicePrincipal),
            "application" => Ok(Self::Application),
            other => Err(IdentifierError::new(
                other,
                "principal kind must be `servicePrincipal` or `application`",
            )),
        }
    }
}
