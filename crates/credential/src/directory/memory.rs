//! In-memory directory with replication lag
//!
//! Writes land immediately in the authoritative copy, but reads keep
//! returning the previous snapshot until a configured number of reads has
//! passed. Transient stale reads and failures can be injected on top, which
//! is enough to drive the reconciler through every branch of its
//! confirmation loop without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use crate::core::{CredentialKind, PrincipalId, PrincipalKind};
use crate::directory::{DirectoryClient, DirectoryError, PrincipalRecord};
use crate::set::CredentialSet;

#[derive(Debug)]
struct Entry {
    /// What the directory has accepted
    committed: PrincipalRecord,
    /// What reads currently return
    visible: PrincipalRecord,
    /// Snapshot before the last write, served by injected stale reads
    previous: Option<PrincipalRecord>,
    /// Reads left before `committed` becomes visible
    lag: usize,
}

#[derive(Debug, Default)]
struct State {
    principals: HashMap<PrincipalId, Entry>,
    stale_reads: usize,
}

/// [`DirectoryClient`] backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
    read_lag: usize,
    fail_on_read: AtomicBool,
    fail_on_write: AtomicBool,
    read_count: AtomicU32,
    write_count: AtomicU32,
}

impl InMemoryDirectory {
    /// Directory where every write is visible to the very next read.
    pub fn new() -> Self {
        Self::default()
    }

    /// Each write stays invisible for the next `reads` reads of that principal.
    pub fn with_read_lag(mut self, reads: usize) -> Self {
        self.read_lag = reads;
        self
    }

    /// Add or overwrite a principal, visible immediately.
    pub fn insert_principal(&self, record: PrincipalRecord) {
        let record = redact(record);
        self.state.lock().principals.insert(
            record.id,
            Entry {
                committed: record.clone(),
                visible: record,
                previous: None,
                lag: 0,
            },
        );
    }

    /// Add an empty principal of the given kind.
    pub fn create_principal(&self, kind: PrincipalKind) -> PrincipalId {
        let id = PrincipalId::new_random();
        self.insert_principal(PrincipalRecord::new(id, kind));
        id
    }

    /// Delete a principal.
    pub fn remove_principal(&self, principal: &PrincipalId) -> Option<PrincipalRecord> {
        self.state
            .lock()
            .principals
            .remove(principal)
            .map(|entry| entry.committed)
    }

    /// Authoritative state of a principal, ignoring read lag.
    pub fn committed(&self, principal: &PrincipalId) -> Option<PrincipalRecord> {
        self.state
            .lock()
            .principals
            .get(principal)
            .map(|entry| entry.committed.clone())
    }

    /// Serve the pre-write snapshot for the next `reads` reads.
    pub fn inject_stale_reads(&self, reads: usize) {
        self.state.lock().stale_reads = reads;
    }

    /// Make next read fail
    pub fn fail_next_read(&self) {
        self.fail_on_read.store(true, Ordering::SeqCst);
    }

    /// Make next write fail
    pub fn fail_next_write(&self) {
        self.fail_on_write.store(true, Ordering::SeqCst);
    }

    /// Number of `get_principal` calls
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Number of `replace_credentials` calls
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn get_principal(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<PrincipalRecord>, DirectoryError> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_read.swap(false, Ordering::SeqCst) {
            return Err(DirectoryError::new("injected read failure").retryable());
        }

        let mut state = self.state.lock();
        let stale = if state.stale_reads > 0 {
            state.stale_reads -= 1;
            true
        } else {
            false
        };

        let Some(entry) = state.principals.get_mut(principal) else {
            return Ok(None);
        };

        if entry.lag > 0 {
            entry.lag -= 1;
        } else {
            entry.visible = entry.committed.clone();
        }

        let record = match (&entry.previous, stale) {
            (Some(previous), true) => previous.clone(),
            _ => entry.visible.clone(),
        };
        trace!(%principal, lag = entry.lag, stale, "Served principal");
        Ok(Some(record))
    }

    async fn replace_credentials(
        &self,
        principal: &PrincipalId,
        kind: CredentialKind,
        credentials: &CredentialSet,
    ) -> Result<(), DirectoryError> {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_write.swap(false, Ordering::SeqCst) {
            return Err(DirectoryError::new("injected write failure"));
        }

        let mut state = self.state.lock();
        let entry = state
            .principals
            .get_mut(principal)
            .ok_or_else(|| DirectoryError::new(format!("principal {principal} does not exist")))?;

        entry.previous = Some(entry.visible.clone());
        entry
            .committed
            .set_credentials(kind, credentials.redacted());
        entry.lag = self.read_lag;
        trace!(%principal, %kind, count = credentials.len(), "Replaced credentials");
        Ok(())
    }
}

fn redact(mut record: PrincipalRecord) -> PrincipalRecord {
    record.key_credentials = record.key_credentials.redacted();
    record.password_credentials = record.password_credentials.redacted();
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CredentialDescriptor, KeyCredentialType, KeyId, SecretValue};

    fn one_certificate() -> (KeyId, CredentialSet) {
        let key_id = KeyId::generate();
        let set = CredentialSet::new()
            .with_added(
                CredentialDescriptor::new(key_id, KeyCredentialType::AsymmetricX509Cert)
                    .with_value(SecretValue::new(vec![0x30, 0x82])),
            )
            .unwrap();
        (key_id, set)
    }

    #[tokio::test]
    async fn write_becomes_visible_after_lag() {
        let directory = InMemoryDirectory::new().with_read_lag(2);
        let principal = directory.create_principal(PrincipalKind::ServicePrincipal);
        let (key_id, set) = one_certificate();

        directory
            .replace_credentials(&principal, CredentialKind::Certificate, &set)
            .await
            .unwrap();

        for _ in 0..2 {
            let record = directory.get_principal(&principal).await.unwrap().unwrap();
            assert!(!record.key_credentials.contains(&key_id));
        }
        let record = directory.get_principal(&principal).await.unwrap().unwrap();
        assert!(record.key_credentials.contains(&key_id));
        assert_eq!(directory.read_count(), 3);
        assert_eq!(directory.write_count(), 1);
    }

    #[tokio::test]
    async fn stored_credentials_never_keep_material() {
        let directory = InMemoryDirectory::new();
        let principal = directory.create_principal(PrincipalKind::ServicePrincipal);
        let (key_id, set) = one_certificate();

        directory
            .replace_credentials(&principal, CredentialKind::Certificate, &set)
            .await
            .unwrap();

        let record = directory.get_principal(&principal).await.unwrap().unwrap();
        let stored = record.key_credentials.find_by_key_id(&key_id).unwrap();
        assert!(stored.raw_value.is_none());
    }

    #[tokio::test]
    async fn stale_reads_serve_previous_snapshot() {
        let directory = InMemoryDirectory::new();
        let principal = directory.create_principal(PrincipalKind::ServicePrincipal);
        let (key_id, set) = one_certificate();

        directory
            .replace_credentials(&principal, CredentialKind::Certificate, &set)
            .await
            .unwrap();
        directory.inject_stale_reads(1);

        let stale = directory.get_principal(&principal).await.unwrap().unwrap();
        assert!(!stale.key_credentials.contains(&key_id));
        let fresh = directory.get_principal(&principal).await.unwrap().unwrap();
        assert!(fresh.key_credentials.contains(&key_id));
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let directory = InMemoryDirectory::new();
        let principal = directory.create_principal(PrincipalKind::Application);

        directory.fail_next_read();
        let err = directory.get_principal(&principal).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(directory.get_principal(&principal).await.is_ok());

        directory.fail_next_write();
        let empty = CredentialSet::new();
        assert!(
            directory
                .replace_credentials(&principal, CredentialKind::Password, &empty)
                .await
                .is_err()
        );
        assert!(
            directory
                .replace_credentials(&principal, CredentialKind::Password, &empty)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn missing_principal_reads_as_none_and_rejects_writes() {
        let directory = InMemoryDirectory::new();
        let principal = PrincipalId::new_random();
        assert!(directory.get_principal(&principal).await.unwrap().is_none());
        assert!(
            directory
                .replace_credentials(&principal, CredentialKind::Certificate, &CredentialSet::new())
                .await
                .is_err()
        );
    }
}
