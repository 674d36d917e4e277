//! Core types for credential reconciliation

mod descriptor;
mod error;
mod id;
mod principal;

pub use descriptor::{CredentialDescriptor, CredentialKind, KeyCredentialType, KeyId, SecretValue};
pub use error::{
    CredentialError, IdentifierError, Operation, ReconcileError, ReconcileResult,
};
pub use id::CredentialResourceId;
pub use principal::{PrincipalId, PrincipalKind};
