//! A principal's collection of credentials
//!
//! [`CredentialSet`] mirrors one credential collection of a directory
//! principal. It is a value: every change produces a new set, so a set that
//! has been handed out never changes under its reader.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{CredentialDescriptor, KeyId};

/// A credential with the same key ID is already present
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("credential with key ID {key_id} already exists")]
pub struct AlreadyExists {
    /// The duplicate key ID
    pub key_id: KeyId,
}

/// Ordered credentials of one principal, unique by key ID.
///
/// Serialized as a plain list. Deserializing goes through [`FromIterator`],
/// so repeated key IDs in the input collapse to their first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CredentialDescriptor>", into = "Vec<CredentialDescriptor>")]
pub struct CredentialSet {
    credentials: Vec<CredentialDescriptor>,
}

impl CredentialSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a credential by key ID.
    ///
    /// A miss is an ordinary outcome, used to choose between add and
    /// conflict or between delete and no-op.
    pub fn find_by_key_id(&self, key_id: &KeyId) -> Option<&CredentialDescriptor> {
        self.credentials
            .iter()
            .find(|credential| credential.key_id == *key_id)
    }

    /// Whether a credential with this key ID is present.
    pub fn contains(&self, key_id: &KeyId) -> bool {
        self.find_by_key_id(key_id).is_some()
    }

    /// New set with `descriptor` appended.
    ///
    /// Uniqueness is enforced here rather than by the directory: the write
    /// path is a full replace, so nothing downstream would catch a duplicate.
    pub fn with_added(&self, descriptor: CredentialDescriptor) -> Result<Self, AlreadyExists> {
        if self.contains(&descriptor.key_id) {
            return Err(AlreadyExists {
                key_id: descriptor.key_id,
            });
        }

        let mut credentials = Vec::with_capacity(self.credentials.len() + 1);
        credentials.extend(self.credentials.iter().cloned());
        credentials.push(descriptor);
        Ok(Self { credentials })
    }

    /// New set without the credential matching `key_id`. Equal to `self`
    /// when there is no such credential.
    pub fn with_removed(&self, key_id: &KeyId) -> Self {
        Self {
            credentials: self
                .credentials
                .iter()
                .filter(|credential| credential.key_id != *key_id)
                .cloned()
                .collect(),
        }
    }

    /// Number of credentials
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Iterate in directory order.
    pub fn iter(&self) -> std::slice::Iter<'_, CredentialDescriptor> {
        self.credentials.iter()
    }

    /// Key IDs in directory order.
    pub fn key_ids(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.credentials.iter().map(|credential| credential.key_id)
    }

    /// Copy with every credential's material stripped.
    pub fn redacted(&self) -> Self {
        Self {
            credentials: self
                .credentials
                .iter()
                .map(CredentialDescriptor::redacted)
                .collect(),
        }
    }
}

impl FromIterator<CredentialDescriptor> for CredentialSet {
    /// Later duplicates of a key ID are dropped.
    fn from_iter<I: IntoIterator<Item = CredentialDescriptor>>(iter: I) -> Self {
        let mut set = Self::new();
        for descriptor in iter {
            if !set.contains(&descriptor.key_id) {
                set.credentials.push(descriptor);
            }
        }
        set
    }
}

impl From<Vec<CredentialDescriptor>> for CredentialSet {
    fn from(credentials: Vec<CredentialDescriptor>) -> Self {
        credentials.into_iter().collect()
    }
}

impl From<CredentialSet> for Vec<CredentialDescriptor> {
    fn from(set: CredentialSet) -> Self {
        set.credentials
    }
}

impl<'a> IntoIterator for &'a CredentialSet {
    type Item = &'a CredentialDescriptor;
    type IntoIter = std::slice::Iter<'a, CredentialDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
