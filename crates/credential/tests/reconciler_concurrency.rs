//! Concurrency tests for the credential reconciler
//!
//! Operations on different principals must overlap; operations on the same
//! principal must serialize without losing each other's writes.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use keyward_credential::prelude::*;
use pretty_assertions::assert_eq;
use tokio::time::Instant;

fn create_reconciler(directory: &Arc<InMemoryDirectory>) -> CredentialReconciler {
    let _ = keyward_log::init_test();
    CredentialReconciler::new(
        directory.clone(),
        Arc::new(NamedMutexRegistry::new()),
        ReconcilerConfig::default(),
    )
    .unwrap()
}

fn certificate() -> CredentialDescriptor {
    CredentialDescriptor::new(KeyId::generate(), KeyCredentialType::AsymmetricX509Cert)
}

#[tokio::test(start_paused = true)]
async fn test_disjoint_principals_run_in_parallel() {
    // GIVEN: Two principals
    let directory = Arc::new(InMemoryDirectory::new());
    let reconciler = create_reconciler(&directory);
    let first = directory.create_principal(PrincipalKind::ServicePrincipal);
    let second = directory.create_principal(PrincipalKind::ServicePrincipal);

    // WHEN: Both get a certificate at once
    let started = Instant::now();
    let (a, b) = tokio::join!(
        reconciler.attach(PrincipalKind::ServicePrincipal, first, certificate()),
        reconciler.attach(PrincipalKind::ServicePrincipal, second, certificate()),
    );

    // THEN: Both succeed in the time of one confirmation
    a.unwrap();
    b.unwrap();
    assert!(started.elapsed() < Duration::from_secs(6));
    assert_eq!(reconciler.locks().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_racing_attaches_on_one_principal_both_survive() {
    // GIVEN: One principal and a directory with replication lag
    let directory = Arc::new(InMemoryDirectory::new().with_read_lag(2));
    let reconciler = create_reconciler(&directory);
    let principal = directory.create_principal(PrincipalKind::ServicePrincipal);
    let left = certificate();
    let right = certificate();
    let (left_key, right_key) = (left.key_id, right.key_id);

    // WHEN: Two attaches race from separate tasks
    let started = Instant::now();
    let tasks = [left, right].map(|descriptor| {
        let reconciler = reconciler.clone();
        tokio::spawn(async move {
            reconciler
                .attach(PrincipalKind::ServicePrincipal, principal, descriptor)
                .await
        })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    // THEN: Neither write overwrote the other
    let committed = directory.committed(&principal).unwrap();
    assert!(committed.key_credentials.contains(&left_key));
    assert!(committed.key_credentials.contains(&right_key));
    assert_eq!(committed.key_credentials.len(), 2);

    // THEN: They ran one after the other
    assert!(started.elapsed() >= Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn test_attach_and_detach_on_one_principal_serialize() {
    // GIVEN: A principal with one certificate
    let directory = Arc::new(InMemoryDirectory::new().with_read_lag(1));
    let reconciler = create_reconciler(&directory);
    let principal = directory.create_principal(PrincipalKind::Application);
    let existing = reconciler
        .attach(PrincipalKind::Application, principal, certificate())
        .await
        .unwrap();
    let incoming = certificate();
    let incoming_key = incoming.key_id;

    // WHEN: A detach of the old one races an attach of a new one
    let (detached, attached) = tokio::join!(
        reconciler.detach(&existing),
        reconciler.attach(PrincipalKind::Application, principal, incoming),
    );

    // THEN: The directory ends with exactly the new certificate
    detached.unwrap();
    attached.unwrap();
    let committed = directory.committed(&principal).unwrap();
    let keys: Vec<KeyId> = committed.key_credentials.key_ids().collect();
    assert_eq!(keys, vec![incoming_key]);
}

#[tokio::test(start_paused = true)]
async fn test_reconcilers_sharing_locks_exclude_each_other() {
    // GIVEN: Two reconcilers sharing a lock registry
    let directory = Arc::new(InMemoryDirectory::new().with_read_lag(1));
    let locks = Arc::new(NamedMutexRegistry::new());
    let one = CredentialReconciler::new(
        directory.clone(),
        Arc::clone(&locks),
        ReconcilerConfig::default(),
    )
    .unwrap();
    let two =
        CredentialReconciler::new(directory.clone(), locks, ReconcilerConfig::default()).unwrap();
    let principal = directory.create_principal(PrincipalKind::ServicePrincipal);

    // WHEN: Each attaches a certificate concurrently
    let (a, b) = tokio::join!(
        one.attach(PrincipalKind::ServicePrincipal, principal, certificate()),
        two.attach(PrincipalKind::ServicePrincipal, principal, certificate()),
    );

    // THEN: Both certificates are kept
    a.unwrap();
    b.unwrap();
    assert_eq!(directory.committed(&principal).unwrap().key_credentials.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_attach_under_another_kind_cannot_clobber() {
    // GIVEN: A service principal and a directory with replication lag
    let directory = Arc::new(InMemoryDirectory::new().with_read_lag(2));
    let reconciler = create_reconciler(&directory);
    let principal = directory.create_principal(PrincipalKind::ServicePrincipal);
    let genuine = certificate();
    let genuine_key = genuine.key_id;

    // WHEN: An attach under the right kind races one under the wrong kind
    let (right_kind, wrong_kind) = tokio::join!(
        reconciler.attach(PrincipalKind::ServicePrincipal, principal, genuine),
        reconciler.attach(PrincipalKind::Application, principal, certificate()),
    );

    // THEN: The mismatched kind never touches the principal
    right_kind.unwrap();
    let err = wrong_kind.unwrap_err();
    assert!(err.is_principal_not_found(), "{err:?}");
    assert_eq!(directory.write_count(), 1);

    // THEN: The genuine credential survives
    let committed = directory.committed(&principal).unwrap();
    let keys: Vec<KeyId> = committed.key_credentials.key_ids().collect();
    assert_eq!(keys, vec![genuine_key]);
}
