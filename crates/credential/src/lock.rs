//! Named mutex registry
//!
//! One async mutex per name, created on first use and kept for the lifetime
//! of the registry. The reconciler names locks after principals, so every
//! read-modify-write on one principal runs alone while other principals
//! proceed in parallel.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, trace};

use crate::core::{PrincipalId, PrincipalKind};

/// Registry of named mutexes.
///
/// Share it as `Arc<NamedMutexRegistry>` between every component that must
/// exclude the others on the same names.
#[derive(Default)]
pub struct NamedMutexRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl NamedMutexRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock name for a principal: `"{principalKind}:{principalId}"`.
    pub fn lock_key(kind: PrincipalKind, principal: &PrincipalId) -> String {
        format!("{kind}:{principal}")
    }

    /// Wait until no other holder of `key` remains, then hold it.
    ///
    /// The lock is released when the returned guard is dropped.
    pub async fn acquire(&self, key: &str) -> NamedLockGuard {
        let mutex = self.mutex(key);
        trace!(key, "Waiting for named lock");
        let guard = mutex.lock_owned().await;
        debug!(key, "Named lock acquired");
        NamedLockGuard {
            key: key.to_owned(),
            _guard: guard,
        }
    }

    /// Take `key` only if nobody holds it right now.
    pub fn try_acquire(&self, key: &str) -> Option<NamedLockGuard> {
        let guard = self.mutex(key).try_lock_owned().ok()?;
        debug!(key, "Named lock acquired without waiting");
        Some(NamedLockGuard {
            key: key.to_owned(),
            _guard: guard,
        })
    }

    /// Number of names ever locked
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no name was ever locked
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn mutex(&self, key: &str) -> Arc<Mutex<()>> {
        // Clone out of the map: a shard guard must not live across an await.
        if let Some(existing) = self.locks.get(key) {
            return Arc::clone(existing.value());
        }
        Arc::clone(
            self.locks
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }
}

impl fmt::Debug for NamedMutexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedMutexRegistry")
            .field("names", &self.locks.len())
            .finish()
    }
}

/// Holds one named lock until dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct NamedLockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl NamedLockGuard {
    /// Name of the held lock
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for NamedLockGuard {
    fn drop(&mut self) {
        trace!(key = %self.key, "Named lock released");
    }
}

impl fmt::Debug for NamedLockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedLockGuard")
            .field("key", &self.key)
            .finish()
    }
}
