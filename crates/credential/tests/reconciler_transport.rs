//! Directory client failures surface as transport errors with context

use std::error::Error as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use keyward_credential::prelude::*;
use keyward_credential::Operation;
use mockall::mock;
use mockall::predicate::eq;

mock! {
    pub Directory {}

    #[async_trait]
    impl DirectoryClient for Directory {
        async fn get_principal(
            &self,
            principal: &PrincipalId,
        ) -> Result<Option<PrincipalRecord>, DirectoryError>;

        async fn replace_credentials(
            &self,
            principal: &PrincipalId,
            kind: CredentialKind,
            credentials: &CredentialSet,
        ) -> Result<(), DirectoryError>;
    }
}

fn create_reconciler(directory: MockDirectory) -> CredentialReconciler {
    let _ = keyward_log::init_test();
    CredentialReconciler::new(
        Arc::new(directory),
        Arc::new(NamedMutexRegistry::new()),
        ReconcilerConfig::default(),
    )
    .unwrap()
}

fn certificate() -> CredentialDescriptor {
    CredentialDescriptor::new(KeyId::generate(), KeyCredentialType::AsymmetricX509Cert)
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_skips_write() {
    // GIVEN: A directory that cannot be read
    let principal = PrincipalId::new_random();
    let mut directory = MockDirectory::new();
    directory
        .expect_get_principal()
        .with(eq(principal))
        .times(1)
        .returning(|_| Err(DirectoryError::new("503 service unavailable").retryable()));
    directory.expect_replace_credentials().never();

    // WHEN: A certificate is attached
    let err = create_reconciler(directory)
        .attach(PrincipalKind::ServicePrincipal, principal, certificate())
        .await
        .unwrap_err();

    // THEN: The directory error is wrapped with operation and principal
    match &err {
        ReconcileError::Transport {
            operation,
            principal: failed,
            source,
        } => {
            assert_eq!(*operation, Operation::Attach);
            assert_eq!(*failed, principal);
            assert!(source.is_retryable());
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(
        err.source().map(ToString::to_string).as_deref(),
        Some("503 service unavailable")
    );
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_is_not_confirmed() {
    // GIVEN: A directory that rejects the write
    let principal = PrincipalId::new_random();
    let mut directory = MockDirectory::new();
    directory
        .expect_get_principal()
        .times(1)
        .returning(move |_| {
            Ok(Some(PrincipalRecord::new(
                principal,
                PrincipalKind::ServicePrincipal,
            )))
        });
    directory
        .expect_replace_credentials()
        .withf(|_, kind, set| *kind == CredentialKind::Certificate && set.len() == 1)
        .times(1)
        .returning(|_, _, _| Err(DirectoryError::new("403 insufficient privileges")));

    // WHEN: A certificate is attached
    let err = create_reconciler(directory)
        .attach(PrincipalKind::ServicePrincipal, principal, certificate())
        .await
        .unwrap_err();

    // THEN: The failure is reported without polling
    assert!(matches!(err, ReconcileError::Transport { .. }), "{err:?}");
    assert!(err.to_string().contains("403 insufficient privileges"));
}

#[tokio::test(start_paused = true)]
async fn test_probe_failure_aborts_confirmation() {
    // GIVEN: A directory that fails on the second confirmation read
    let principal = PrincipalId::new_random();
    let descriptor = certificate();
    let stored = CredentialSet::new().with_added(descriptor.clone()).unwrap();
    let reads = Arc::new(AtomicUsize::new(0));

    let mut directory = MockDirectory::new();
    directory.expect_get_principal().returning({
        let reads = Arc::clone(&reads);
        move |_| {
            let mut record = PrincipalRecord::new(principal, PrincipalKind::ServicePrincipal);
            match reads.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(Some(record)),
                1 => {
                    record.key_credentials = stored.clone();
                    Ok(Some(record))
                }
                _ => Err(DirectoryError::new("connection reset")),
            }
        }
    });
    directory
        .expect_replace_credentials()
        .times(1)
        .returning(|_, _, _| Ok(()));

    // WHEN: A certificate is attached
    let err = create_reconciler(directory)
        .attach(PrincipalKind::ServicePrincipal, principal, descriptor)
        .await
        .unwrap_err();

    // THEN: The probe error ends the operation at once, without retries
    assert!(matches!(err, ReconcileError::Transport { .. }), "{err:?}");
    assert_eq!(reads.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_read_failure_is_transport() {
    let principal = PrincipalId::new_random();
    let mut directory = MockDirectory::new();
    directory
        .expect_get_principal()
        .returning(|_| Err(DirectoryError::new("throttled").retryable()));

    let id = CredentialResourceId::new(
        PrincipalKind::Application,
        principal,
        CredentialKind::Password,
        KeyId::generate(),
    );
    let err = create_reconciler(directory).read(&id).await.unwrap_err();

    assert_eq!(err.operation(), Some(Operation::Read));
    assert!(err.to_string().starts_with("read:"));
}
