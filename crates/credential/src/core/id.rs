//! Composite resource identifier for an attached credential
//!
//! The CRUD layer persists `"{principalKind}/{principalId}/{credentialKind}/{keyId}"`
//! as the externally visible identity of a credential and parses it back for
//! reads and deletes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{CredentialKind, IdentifierError, KeyId, PrincipalId, PrincipalKind};

/// Number of `/`-separated segments in a resource identifier.
const SEGMENTS: usize = 4;

/// Identity of one credential attached to one principal.
///
/// # Examples
///
/// ```
/// use keyward_credential::CredentialResourceId;
///
/// let id: CredentialResourceId = "servicePrincipal/11111111-1111-1111-1111-111111111111/certificate/22222222-2222-2222-2222-222222222222"
///     .parse()?;
/// assert_eq!(id.principal_kind.as_str(), "servicePrincipal");
///
/// assert!("servicePrincipal/11111111-1111-1111-1111-111111111111/certificate".parse::<CredentialResourceId>().is_err());
/// # Ok::<(), keyward_credential::IdentifierError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialResourceId {
    /// Kind of principal owning the credential
    pub principal_kind: PrincipalKind,
    /// Principal owning the credential
    pub principal_id: PrincipalId,
    /// Collection the credential lives in
    pub credential_kind: CredentialKind,
    /// Credential key ID
    pub key_id: KeyId,
}

impl CredentialResourceId {
    /// Assemble an identifier from its parts.
    pub const fn new(
        principal_kind: PrincipalKind,
        principal_id: PrincipalId,
        credential_kind: CredentialKind,
        key_id: KeyId,
    ) -> Self {
        Self {
            principal_kind,
            principal_id,
            credential_kind,
            key_id,
        }
    }
}

impl fmt::Display for CredentialResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.principal_kind, self.principal_id, self.credential_kind, self.key_id
        )
    }
}

impl FromStr for CredentialResourceId {
    type Err = IdentifierError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = input.split('/').collect();
        if segments.len() != SEGMENTS {
            return Err(IdentifierError::new(
                input,
                format!(
                    "expected {SEGMENTS} segments \
                     `{{principalKind}}/{{principalId}}/{{credentialKind}}/{{keyId}}`, found {}",
                    segments.len()
                ),
            ));
        }
        if let Some(position) = segments.iter().position(|segment| segment.is_empty()) {
            return Err(IdentifierError::new(
                input,
                format!("segment {} is empty", position + 1),
            ));
        }

        let within = |e: IdentifierError| IdentifierError::new(input, e.reason);

        Ok(Self {
            principal_kind: segments[0].parse().map_err(within)?,
            principal_id: segments[1].parse().map_err(within)?,
            credential_kind: segments[2].parse().map_err(within)?,
            key_id: segments[3].parse().map_err(within)?,
        })
    }
}

impl TryFrom<String> for CredentialResourceId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CredentialResourceId> for String {
    fn from(id: CredentialResourceId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const PRINCIPAL: &str = "11111111-1111-1111-1111-111111111111";
    const KEY: &str = "22222222-2222-2222-2222-222222222222";

    #[test]
    fn format_then_parse_reproduces_tuple() {
        let id = CredentialResourceId::new(
            PrincipalKind::ServicePrincipal,
            PRINCIPAL.parse().unwrap(),
            CredentialKind::Certificate,
            KEY.parse().unwrap(),
        );

        let formatted = id.to_string();
        assert_eq!(formatted, format!("servicePrincipal/{PRINCIPAL}/certificate/{KEY}"));

        let parsed: CredentialResourceId = formatted.parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.principal_id.to_string(), PRINCIPAL);
        assert_eq!(parsed.key_id.to_string(), KEY);
    }

    #[test]
    fn upper_case_uuids_parse_to_same_identity() {
        let lower: CredentialResourceId =
            format!("application/{PRINCIPAL}/password/{KEY}").parse().unwrap();
        let upper: CredentialResourceId = format!(
            "application/{}/password/{}",
            PRINCIPAL.to_uppercase(),
            KEY.to_uppercase()
        )
        .parse()
        .unwrap();
        assert_eq!(lower, upper);
    }

    #[rstest]
    #[case::missing_segment("servicePrincipal/11111111-1111-1111-1111-111111111111/certificate")]
    #[case::extra_segment(
        "servicePrincipal/11111111-1111-1111-1111-111111111111/certificate/22222222-2222-2222-2222-222222222222/x"
    )]
    #[case::empty_segment("servicePrincipal//certificate/22222222-2222-2222-2222-222222222222")]
    #[case::principal_not_uuid("servicePrincipal/not-a-uuid/certificate/22222222-2222-2222-2222-222222222222")]
    #[case::key_not_uuid("servicePrincipal/11111111-1111-1111-1111-111111111111/certificate/abc")]
    #[case::unknown_principal_kind(
        "group/11111111-1111-1111-1111-111111111111/certificate/22222222-2222-2222-2222-222222222222"
    )]
    #[case::unknown_credential_kind(
        "servicePrincipal/11111111-1111-1111-1111-111111111111/token/22222222-2222-2222-2222-222222222222"
    )]
    #[case::empty("")]
    fn malformed_identifiers_are_rejected(#[case] input: &str) {
        let err = input.parse::<CredentialResourceId>().unwrap_err();
        assert_eq!(err.input, input);
    }

    #[test]
    fn serde_uses_string_form() {
        let id = CredentialResourceId::new(
            PrincipalKind::ServicePrincipal,
            PRINCIPAL.parse().unwrap(),
            CredentialKind::Certificate,
            KEY.parse().unwrap(),
        );
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"servicePrincipal/{PRINCIPAL}/certificate/{KEY}\""));
        assert!(serde_json::from_str::<CredentialResourceId>("\"nope\"").is_err());
    }
}
