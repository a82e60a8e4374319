use std::sync::Arc;

use jitgate_domain::RoleGrant;

use super::GrantManager;
use crate::test_support::{FakeGrantStore, sample_request, test_now};

#[tokio::test]
async fn ensure_grants_is_idempotent() {
    let grants = Arc::new(FakeGrantStore::default());
    let manager = GrantManager::new(grants.clone());
    let request = sample_request("jit-1", test_now());

    let first = manager.ensure_grants(&request).await;
    let second = manager.ensure_grants(&request).await;

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(grants.grants.lock().await.len(), 2);
}

#[tokio::test]
async fn revoke_of_absent_grants_succeeds() {
    let grants = Arc::new(FakeGrantStore::default());
    let manager = GrantManager::new(grants);
    let request = sample_request("jit-1", test_now());

    let removed = manager.revoke_grants(&request).await;

    assert!(matches!(removed, Ok(0)));
}

#[tokio::test]
async fn revoke_only_touches_owned_grants() {
    let grants = Arc::new(FakeGrantStore::default());
    let manager = GrantManager::new(grants.clone());
    let now = test_now();
    let owned = sample_request("jit-1", now);
    let other = sample_request("jit-2", now);
    for grant in RoleGrant::for_request(&owned)
        .into_iter()
        .chain(RoleGrant::for_request(&other))
    {
        grants
            .grants
            .lock()
            .await
            .insert((grant.namespace.clone(), grant.name.clone()), grant);
    }

    let removed = manager
        .revoke_orphaned("jit-1", &owned.spec.namespaces)
        .await;

    assert!(matches!(removed, Ok(2)));
    let remaining = grants.grants.lock().await;
    assert_eq!(remaining.len(), 2);
    assert!(remaining.values().all(|grant| grant.is_owned_by("jit-2")));
}

#[tokio::test]
async fn has_grants_ignores_foreign_owners() {
    let grants = Arc::new(FakeGrantStore::default());
    let manager = GrantManager::new(grants.clone());
    let now = test_now();
    let owned = sample_request("jit-1", now);
    let other = sample_request("jit-2", now);
    for grant in RoleGrant::for_request(&other) {
        grants
            .grants
            .lock()
            .await
            .insert((grant.namespace.clone(), grant.name.clone()), grant);
    }

    assert!(matches!(manager.has_grants(&owned).await, Ok(false)));
    assert!(manager.ensure_grants(&owned).await.is_ok());
    assert!(matches!(manager.has_grants(&owned).await, Ok(true)));
}
