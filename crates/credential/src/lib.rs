//! Keyward Credential - credential reconciliation for directory principals
//!
//! Attaches and detaches certificates and secrets on principals held in an
//! eventually-consistent directory.
//!
//! # Features
//!
//! - **Per-principal exclusion** - concurrent operations on one principal are
//!   serialized by a named lock, different principals run in parallel
//! - **Confirmed writes** - every write is followed by polling until the
//!   change is observably visible
//! - **Immutable credential sets** - read-modify-write computes a new set and
//!   replaces the old one wholesale
//! - **Secret hygiene** - credential material is zeroized and never logged
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keyward_credential::prelude::*;
//!
//! # async fn example(principal: PrincipalId) -> Result<(), Box<dyn std::error::Error>> {
//! let directory = Arc::new(InMemoryDirectory::new());
//! let reconciler = CredentialReconciler::new(
//!     directory,
//!     Arc::new(NamedMutexRegistry::new()),
//!     ReconcilerConfig::default(),
//! )?;
//!
//! let descriptor = CredentialRequest::certificate("-----BEGIN CERTIFICATE-----\nAAEC\n-----END CERTIFICATE-----")
//!     .into_descriptor()?;
//! let id = reconciler
//!     .attach(PrincipalKind::ServicePrincipal, principal, descriptor)
//!     .await?;
//! reconciler.detach(&id).await?;
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

/// Core types, identifiers and errors
pub mod core;
/// Directory client seam and in-memory directory
pub mod directory;
/// Per-principal named locks
pub mod lock;
/// Attach, detach and read orchestration
pub mod reconciler;
/// Building descriptors from caller input
pub mod request;
/// Credential collections
pub mod set;

// Core types & errors
pub use crate::core::{
    CredentialDescriptor, CredentialError, CredentialKind, CredentialResourceId,
    IdentifierError, KeyCredentialType, KeyId, Operation, PrincipalId, PrincipalKind,
    ReconcileError, ReconcileResult, SecretValue,
};

pub use crate::directory::{DirectoryClient, DirectoryError, InMemoryDirectory, PrincipalRecord};
pub use crate::lock::{NamedLockGuard, NamedMutexRegistry};
pub use crate::reconciler::{CredentialReconciler, ReconcilerConfig};
pub use crate::request::{CredentialRequest, ValueEncoding};
pub use crate::set::{AlreadyExists, CredentialSet};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::core::{
        CredentialDescriptor, CredentialKind, CredentialResourceId, KeyCredentialType, KeyId,
        PrincipalId, PrincipalKind, ReconcileError, ReconcileResult,
    };
    pub use crate::directory::{DirectoryClient, DirectoryError, InMemoryDirectory, PrincipalRecord};
    pub use crate::lock::NamedMutexRegistry;
    pub use crate::reconciler::{CredentialReconciler, ReconcilerConfig};
    pub use crate::request::{CredentialRequest, ValueEncoding};
    pub use crate::set::CredentialSet;
}
