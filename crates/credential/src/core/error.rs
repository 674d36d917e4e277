//! Error types for credential reconciliation
//!
//! - [`ReconcileError`]: failures of attach/detach/read, always carrying the
//!   operation and principal so a message is actionable on its own
//! - [`CredentialError`]: invalid caller input while building a descriptor,
//!   naming the offending attribute
//! - [`IdentifierError`]: malformed composite resource identifier

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::{CredentialResourceId, KeyId, PrincipalId};
use crate::directory::DirectoryError;

/// Reconciler operation, used as error and log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Add a credential
    Attach,
    /// Remove a credential
    Detach,
    /// Look a credential up
    Read,
}

impl Operation {
    /// Lower-case name for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Malformed composite resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid credential identifier {input:?}: {reason}")]
pub struct IdentifierError {
    /// The rejected input
    pub input: String,
    /// What was wrong with it
    pub reason: String,
}

impl IdentifierError {
    /// Build an identifier error.
    pub fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a reconciler operation
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The principal does not exist in the directory
    #[error("{operation}: principal {principal} was not found")]
    PrincipalNotFound {
        /// Operation that failed
        operation: Operation,
        /// Missing principal
        principal: PrincipalId,
    },

    /// The key ID is already present on the principal
    #[error(
        "{operation}: credential {id} already exists - to be managed it needs to be imported"
    )]
    ResourceAlreadyExists {
        /// Operation that failed
        operation: Operation,
        /// Identifier of the existing credential
        id: CredentialResourceId,
    },

    /// A resource identifier could not be parsed
    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),

    /// The write was accepted but did not become visible before the deadline.
    /// The remote change did happen; it was only not confirmed.
    #[error(
        "{operation}: timed out after {timeout:?} waiting for credential {key_id} on principal {principal} to propagate"
    )]
    Timeout {
        /// Operation that failed
        operation: Operation,
        /// Principal being modified
        principal: PrincipalId,
        /// Credential being confirmed
        key_id: KeyId,
        /// Time allowed for the operation
        timeout: Duration,
    },

    /// Confirmation observed a state that is neither pending nor target
    #[error(
        "{operation}: credential {key_id} on principal {principal} reached unexpected state {state}"
    )]
    UnexpectedState {
        /// Operation that failed
        operation: Operation,
        /// Principal being modified
        principal: PrincipalId,
        /// Credential being confirmed
        key_id: KeyId,
        /// Observed state
        state: String,
    },

    /// The directory client reported an error
    #[error("{operation}: directory request for principal {principal} failed: {source}")]
    Transport {
        /// Operation that failed
        operation: Operation,
        /// Principal being accessed
        principal: PrincipalId,
        /// Underlying directory error
        #[source]
        source: DirectoryError,
    },
}

impl ReconcileError {
    /// Whether this signals a duplicate create that should be imported instead.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::ResourceAlreadyExists { .. })
    }

    /// Whether confirmation timed out after a successful write.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether the principal was missing.
    pub fn is_principal_not_found(&self) -> bool {
        matches!(self, Self::PrincipalNotFound { .. })
    }

    /// Operation the error came from, if it came from one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::PrincipalNotFound { operation, .. }
            | Self::ResourceAlreadyExists { operation, .. }
            | Self::Timeout { operation, .. }
            | Self::UnexpectedState { operation, .. }
            | Self::Transport { operation, .. } => Some(*operation),
            Self::InvalidIdentifier(_) => None,
        }
    }
}

/// Result type alias for reconciler operations
pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;

/// Invalid input while building a credential descriptor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The credential value could not be decoded
    #[error("could not decode {encoding} credential value: {reason}")]
    InvalidValue {
        /// Declared encoding
        encoding: &'static str,
        /// Decoder complaint
        reason: String,
    },

    /// The credential value is empty
    #[error("credential value is empty")]
    EmptyValue,

    /// The supplied key ID is not a UUID
    #[error("invalid key ID: {0}")]
    InvalidKeyId(IdentifierError),

    /// The supplied credential type is unknown
    #[error("invalid credential type: {0}")]
    InvalidType(String),

    /// A date is not RFC 3339
    #[error("`{attr}` is not an RFC 3339 timestamp ({value:?}): {reason}")]
    InvalidDate {
        /// Attribute holding the date
        attr: &'static str,
        /// Rejected input
        value: String,
        /// Parser complaint
        reason: String,
    },

    /// The relative end date is not a duration
    #[error("`end_date_relative` is not a duration ({value:?}): {reason}")]
    InvalidDuration {
        /// Rejected input
        value: String,
        /// Parser complaint
        reason: String,
    },

    /// Both an absolute and a relative end date were given
    #[error("`end_date` and `end_date_relative` cannot both be set")]
    ConflictingEndDate,

    /// The end date precedes the start date
    #[error("end date {end} is before start date {start}")]
    InvalidDateRange {
        /// Start of validity
        start: DateTime<Utc>,
        /// End of validity
        end: DateTime<Utc>,
    },
}

impl CredentialError {
    /// Input attribute the error refers to.
    pub fn attr(&self) -> &'static str {
        match self {
            Self::InvalidValue { .. } | Self::EmptyValue => "value",
            Self::InvalidKeyId(_) => "key_id",
            Self::InvalidType(_) => "type",
            Self::InvalidDate { attr, .. } => *attr,
            Self::InvalidDuration { .. } => "end_date_relative",
            Self::ConflictingEndDate | Self::InvalidDateRange { .. } => "end_date",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CredentialKind, PrincipalKind};

    #[test]
    fn already_exists_message_suggests_import() {
        let id = CredentialResourceId::new(
            PrincipalKind::ServicePrincipal,
            PrincipalId::new_random(),
            CredentialKind::Certificate,
            KeyId::generate(),
        );
        let err = ReconcileError::ResourceAlreadyExists {
            operation: Operation::Attach,
            id,
        };
        assert!(err.is_already_exists());
        assert!(err.to_string().contains("imported"));
        assert!(err.to_string().contains(&id.to_string()));
        assert_eq!(err.operation(), Some(Operation::Attach));
    }

    #[test]
    fn transport_error_keeps_source_and_context() {
        let principal = PrincipalId::new_random();
        let err = ReconcileError::Transport {
            operation: Operation::Detach,
            principal,
            source: DirectoryError::new("connection reset"),
        };
        let message = err.to_string();
        assert!(message.starts_with("detach:"));
        assert!(message.contains(&principal.to_string()));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn credential_errors_name_their_attribute() {
        assert_eq!(CredentialError::EmptyValue.attr(), "value");
        assert_eq!(CredentialError::ConflictingEndDate.attr(), "end_date");
        let err = CredentialError::InvalidDate {
            attr: "start_date",
            value: "yesterday".into(),
            reason: "input contains invalid characters".into(),
        };
        assert_eq!(err.attr(), "start_date");
    }
}
