use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use jitgate_core::AppResult;
use jitgate_domain::RoleGrant;

/// Resource-store port for scope-bound grant objects.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Creates one grant, failing with `AlreadyExists` on duplicates.
    async fn create_grant(&self, grant: &RoleGrant) -> AppResult<()>;

    /// Lists grants in one namespace.
    async fn list_grants(&self, namespace: &str) -> AppResult<Vec<RoleGrant>>;

    /// Deletes one grant, failing with `NotFound` when absent.
    async fn delete_grant(&self, namespace: &str, name: &str) -> AppResult<()>;
}

/// Port resolving namespaces by label selector.
#[async_trait]
pub trait NamespaceDirectory: Send + Sync {
    /// Returns names of namespaces carrying every given label.
    async fn list_namespaces_by_labels(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> AppResult<BTreeSet<String>>;
}
