//! Credential reconciler - attach, detach and read against a directory
//!
//! Every change is a locked read-modify-write on one principal:
//!
//! ```text
//! Idle -> Locked -> Fetched -> Written -> Confirming -> Done
//!            \________\__________\___________\-------> Failed
//! ```
//!
//! The lock is named after the principal and held until confirmation ends,
//! so two operations on one principal never interleave their fetch and
//! write. Confirmation polls the directory until the change has been seen
//! several times in a row; only then is the operation reported done.
//!
//! Each operation has one deadline, fixed when the call starts. Waiting for
//! the lock, directory calls and confirmation all count against it.

mod config;

pub use config::{DEFAULT_OPERATION_TIMEOUT, ReconcilerConfig};

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use keyward_resilience::{ConfigResult, ConsistencyPoller, PollConfig, PollError, Probe};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, instrument, warn};

use crate::core::{
    CredentialDescriptor, CredentialKind, CredentialResourceId, KeyId, Operation, PrincipalId,
    PrincipalKind, ReconcileError, ReconcileResult,
};
use crate::directory::{DirectoryClient, DirectoryError, PrincipalRecord};
use crate::lock::{NamedLockGuard, NamedMutexRegistry};
use crate::set::CredentialSet;

/// Whether a credential shows up on its principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Found,
    NotFound,
    PrincipalGone,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Found => "credential present",
            Self::NotFound => "credential absent",
            Self::PrincipalGone => "principal deleted",
        })
    }
}

/// Progress of one locked operation, for logs.
#[derive(Debug, Clone, Copy)]
enum Phase {
    Locked,
    Fetched,
    Written,
    Confirming,
    Done,
    Failed,
}

impl Phase {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Fetched => "fetched",
            Self::Written => "written",
            Self::Confirming => "confirming",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Context of one reconciler call, used to shape errors.
#[derive(Debug, Clone, Copy)]
struct Call {
    operation: Operation,
    principal_kind: PrincipalKind,
    principal: PrincipalId,
    key_id: KeyId,
    timeout: Duration,
    deadline: Instant,
}

impl Call {
    fn start(
        operation: Operation,
        principal_kind: PrincipalKind,
        principal: PrincipalId,
        key_id: KeyId,
        timeout: Duration,
    ) -> Self {
        Self {
            operation,
            principal_kind,
            principal,
            key_id,
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    fn enter(&self, phase: Phase) {
        debug!(
            operation = %self.operation,
            principal = %self.principal,
            key_id = %self.key_id,
            phase = phase.as_str(),
            "Reconciler phase"
        );
    }

    /// Whether `record` is the principal this call addresses.
    ///
    /// The lock is named after kind and id, so a record of another kind
    /// must never be modified under it.
    fn owns(&self, record: &PrincipalRecord) -> bool {
        if record.kind == self.principal_kind {
            return true;
        }
        debug!(
            principal = %self.principal,
            expected = %self.principal_kind,
            actual = %record.kind,
            "Principal has a different kind"
        );
        false
    }

    fn timed_out(&self) -> ReconcileError {
        ReconcileError::Timeout {
            operation: self.operation,
            principal: self.principal,
            key_id: self.key_id,
            timeout: self.timeout,
        }
    }

    fn transport(&self, source: DirectoryError) -> ReconcileError {
        ReconcileError::Transport {
            operation: self.operation,
            principal: self.principal,
            source,
        }
    }

    /// Run a directory call under the call's deadline.
    async fn bounded<T>(
        &self,
        request: impl Future<Output = Result<T, DirectoryError>>,
    ) -> ReconcileResult<T> {
        match timeout_at(self.deadline, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(self.transport(source)),
            Err(_) => Err(self.timed_out()),
        }
    }

    fn finish<T>(&self, result: ReconcileResult<T>) -> ReconcileResult<T> {
        match &result {
            Ok(_) => self.enter(Phase::Done),
            Err(error) => warn!(
                operation = %self.operation,
                principal = %self.principal,
                key_id = %self.key_id,
                phase = Phase::Failed.as_str(),
                error = %error,
                "Reconciler operation failed"
            ),
        }
        result
    }
}

/// Attaches and detaches credentials on directory principals.
///
/// Cheap to clone; clones share the directory client and lock registry.
#[derive(Clone)]
pub struct CredentialReconciler {
    directory: Arc<dyn DirectoryClient>,
    locks: Arc<NamedMutexRegistry>,
    config: ReconcilerConfig,
    appear: ConsistencyPoller<Presence>,
    vanish: ConsistencyPoller<Presence>,
}

impl CredentialReconciler {
    /// Create a reconciler, validating `config`.
    ///
    /// Every reconciler that may touch the same principals must share the
    /// same `locks`.
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        locks: Arc<NamedMutexRegistry>,
        config: ReconcilerConfig,
    ) -> ConfigResult<Self> {
        config.validate()?;

        let appear = ConsistencyPoller::new(
            PollConfig::new([Presence::NotFound], Presence::Found)
                .with_timeout(config.create_timeout)
                .with_settings(config.poll.clone()),
        )?;
        let vanish = ConsistencyPoller::new(
            PollConfig::new([Presence::Found], Presence::NotFound)
                .with_timeout(config.delete_timeout)
                .with_settings(config.poll.clone()),
        )?;

        Ok(Self {
            directory,
            locks,
            config,
            appear,
            vanish,
        })
    }

    /// Get configuration
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Shared lock registry
    pub fn locks(&self) -> &Arc<NamedMutexRegistry> {
        &self.locks
    }

    /// Add `descriptor` to a principal and wait until it is visible.
    ///
    /// Bounded by [`ReconcilerConfig::create_timeout`].
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::PrincipalNotFound`] if the principal does not exist
    ///   or is not a `principal_kind`
    /// - [`ReconcileError::ResourceAlreadyExists`] if the key ID is taken
    /// - [`ReconcileError::Timeout`] if the deadline passes; the write may
    ///   already have happened
    /// - [`ReconcileError::UnexpectedState`] if the principal disappears
    ///   while confirming
    /// - [`ReconcileError::Transport`] if the directory client fails
    pub async fn attach(
        &self,
        principal_kind: PrincipalKind,
        principal: PrincipalId,
        descriptor: CredentialDescriptor,
    ) -> ReconcileResult<CredentialResourceId> {
        self.attach_within(principal_kind, principal, descriptor, self.config.create_timeout)
            .await
    }

    /// [`attach`](Self::attach) with a caller-supplied limit.
    #[instrument(
        name = "attach",
        skip_all,
        fields(%principal_kind, %principal, key_id = %descriptor.key_id)
    )]
    pub async fn attach_within(
        &self,
        principal_kind: PrincipalKind,
        principal: PrincipalId,
        descriptor: CredentialDescriptor,
        timeout: Duration,
    ) -> ReconcileResult<CredentialResourceId> {
        let call = Call::start(
            Operation::Attach,
            principal_kind,
            principal,
            descriptor.key_id,
            timeout,
        );
        let result = self.attach_locked(&call, descriptor).await;
        call.finish(result)
    }

    async fn attach_locked(
        &self,
        call: &Call,
        descriptor: CredentialDescriptor,
    ) -> ReconcileResult<CredentialResourceId> {
        let credential_kind = descriptor.kind();
        let id = CredentialResourceId::new(
            call.principal_kind,
            call.principal,
            credential_kind,
            descriptor.key_id,
        );

        let _guard = self.lock(call).await?;

        let record = self
            .fetch(call)
            .await?
            .ok_or(ReconcileError::PrincipalNotFound {
                operation: call.operation,
                principal: call.principal,
            })?;
        call.enter(Phase::Fetched);

        let updated = record
            .credentials(credential_kind)
            .with_added(descriptor)
            .map_err(|_| ReconcileError::ResourceAlreadyExists {
                operation: call.operation,
                id,
            })?;

        self.write(call, credential_kind, &updated).await?;
        self.confirm(call, &self.appear, credential_kind, false).await?;

        info!(%id, "Credential attached");
        Ok(id)
    }

    /// Remove a credential and wait until it is gone.
    ///
    /// A missing principal, or one of a different kind than `id` names, is
    /// success: there is nothing left to detach.
    /// A missing key on an existing principal still goes through the write
    /// and the confirmation. Bounded by [`ReconcilerConfig::delete_timeout`].
    pub async fn detach(&self, id: &CredentialResourceId) -> ReconcileResult<()> {
        self.detach_within(id, self.config.delete_timeout).await
    }

    /// [`detach`](Self::detach) with a caller-supplied limit.
    #[instrument(name = "detach", skip_all, fields(%id))]
    pub async fn detach_within(
        &self,
        id: &CredentialResourceId,
        timeout: Duration,
    ) -> ReconcileResult<()> {
        let call = Call::start(
            Operation::Detach,
            id.principal_kind,
            id.principal_id,
            id.key_id,
            timeout,
        );
        let result = self.detach_locked(&call, id).await;
        call.finish(result)
    }

    async fn detach_locked(&self, call: &Call, id: &CredentialResourceId) -> ReconcileResult<()> {
        let _guard = self.lock(call).await?;

        let Some(record) = self.fetch(call).await? else {
            info!(%id, "Principal no longer exists, nothing to detach");
            return Ok(());
        };
        call.enter(Phase::Fetched);

        let current = record.credentials(id.credential_kind);
        if !current.contains(&id.key_id) {
            debug!(%id, "Credential already absent");
        }
        let updated = current.with_removed(&id.key_id);

        self.write(call, id.credential_kind, &updated).await?;
        self.confirm(call, &self.vanish, id.credential_kind, true).await?;

        info!(%id, "Credential detached");
        Ok(())
    }

    /// Look up a credential without locking.
    ///
    /// `Ok(None)` when the principal or the key is missing, or the principal
    /// is of another kind. The returned
    /// descriptor never carries credential material. Bounded by
    /// [`ReconcilerConfig::read_timeout`].
    pub async fn read(
        &self,
        id: &CredentialResourceId,
    ) -> ReconcileResult<Option<CredentialDescriptor>> {
        self.read_within(id, self.config.read_timeout).await
    }

    /// [`read`](Self::read) with a caller-supplied limit.
    #[instrument(name = "read", skip_all, fields(%id))]
    pub async fn read_within(
        &self,
        id: &CredentialResourceId,
        limit: Duration,
    ) -> ReconcileResult<Option<CredentialDescriptor>> {
        let call = Call::start(
            Operation::Read,
            id.principal_kind,
            id.principal_id,
            id.key_id,
            limit,
        );

        let record = match timeout(limit, self.directory.get_principal(&id.principal_id)).await {
            Ok(Ok(record)) => record,
            Ok(Err(source)) => return Err(call.transport(source)),
            Err(_) => return Err(call.timed_out()),
        };

        let Some(record) = record.filter(|record| call.owns(record)) else {
            debug!(%id, "Principal not found");
            return Ok(None);
        };

        let found = record
            .credentials(id.credential_kind)
            .find_by_key_id(&id.key_id)
            .map(CredentialDescriptor::redacted);
        if found.is_none() {
            debug!(%id, "Credential not found");
        }
        Ok(found)
    }

    async fn lock(&self, call: &Call) -> ReconcileResult<NamedLockGuard> {
        let key = NamedMutexRegistry::lock_key(call.principal_kind, &call.principal);
        let guard = timeout_at(call.deadline, self.locks.acquire(&key))
            .await
            .map_err(|_| call.timed_out())?;
        call.enter(Phase::Locked);
        Ok(guard)
    }

    /// Fetch the principal; a record of another kind counts as missing.
    async fn fetch(&self, call: &Call) -> ReconcileResult<Option<PrincipalRecord>> {
        let record = call
            .bounded(self.directory.get_principal(&call.principal))
            .await?;
        Ok(record.filter(|record| call.owns(record)))
    }

    async fn write(
        &self,
        call: &Call,
        kind: CredentialKind,
        credentials: &CredentialSet,
    ) -> ReconcileResult<()> {
        call.bounded(
            self.directory
                .replace_credentials(&call.principal, kind, credentials),
        )
        .await?;
        call.enter(Phase::Written);
        Ok(())
    }

    /// Poll until `poller`'s target presence is observed.
    ///
    /// `gone_is_absent` decides what a vanished principal means: the end
    /// state of a detach, or a failure for an attach.
    async fn confirm(
        &self,
        call: &Call,
        poller: &ConsistencyPoller<Presence>,
        kind: CredentialKind,
        gone_is_absent: bool,
    ) -> ReconcileResult<()> {
        let remaining = call.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(call.timed_out());
        }
        call.enter(Phase::Confirming);

        let directory = self.directory.as_ref();

        let probe = || async move {
            let record = directory
                .get_principal(&call.principal)
                .await?
                .filter(|record| call.owns(record));
            let label = match record {
                Some(record) if record.credentials(kind).contains(&call.key_id) => {
                    Presence::Found
                }
                Some(_) => Presence::NotFound,
                None if gone_is_absent => Presence::NotFound,
                None => Presence::PrincipalGone,
            };
            Ok::<_, DirectoryError>(Probe::new((), label))
        };

        match poller.with_timeout(remaining).poll(probe).await {
            Ok(polled) => {
                debug!(
                    attempts = polled.attempts,
                    elapsed_ms = polled.elapsed.as_millis(),
                    "Change confirmed"
                );
                Ok(())
            }
            Err(PollError::Probe { source, .. }) => Err(call.transport(source)),
            Err(PollError::Timeout { .. }) => Err(call.timed_out()),
            Err(PollError::UnexpectedState { observed, .. }) => {
                Err(ReconcileError::UnexpectedState {
                    operation: call.operation,
                    principal: call.principal,
                    key_id: call.key_id,
                    state: observed.label.to_string(),
                })
            }
        }
    }
}

impl fmt::Debug for CredentialReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialReconciler")
            .field("locks", &self.locks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
