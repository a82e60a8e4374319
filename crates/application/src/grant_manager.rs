use std::sync::Arc;

use jitgate_core::AppResult;
use jitgate_domain::{JitRequest, RoleGrant};
use tracing::{debug, info};

use crate::access_ports::GrantStore;

#[cfg(test)]
mod tests;

/// Creates and reclaims scope-bound grants for access requests.
#[derive(Clone)]
pub struct GrantManager {
    grants: Arc<dyn GrantStore>,
}

impl GrantManager {
    /// Creates a grant manager.
    #[must_use]
    pub fn new(grants: Arc<dyn GrantStore>) -> Self {
        Self { grants }
    }

    /// Creates one grant per target namespace. Existing grants count as success.
    pub async fn ensure_grants(&self, request: &JitRequest) -> AppResult<()> {
        for grant in RoleGrant::for_request(request) {
            match self.grants.create_grant(&grant).await {
                Ok(()) => info!(
                    request = %request.name,
                    namespace = %grant.namespace,
                    grant = %grant.name,
                    "grant created"
                ),
                Err(error) if error.is_already_exists() => debug!(
                    request = %request.name,
                    namespace = %grant.namespace,
                    "grant already exists"
                ),
                Err(error) => return Err(error),
            }
        }

        Ok(())
    }

    /// Returns whether any grant owned by the request exists in its namespaces.
    pub async fn has_grants(&self, request: &JitRequest) -> AppResult<bool> {
        for namespace in &request.spec.namespaces {
            let grants = self.grants.list_grants(namespace).await?;
            if grants
                .iter()
                .any(|grant| grant.is_owned_by(request.name.as_str()))
            {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Deletes grants owned by the request in its declared namespaces.
    pub async fn revoke_grants(&self, request: &JitRequest) -> AppResult<usize> {
        self.revoke_owned(request.name.as_str(), &request.spec.namespaces)
            .await
    }

    /// Deletes grants owned by a request that can no longer be read.
    pub async fn revoke_orphaned(
        &self,
        request_name: &str,
        namespaces: &[String],
    ) -> AppResult<usize> {
        let removed = self.revoke_owned(request_name, namespaces).await?;
        if removed > 0 {
            info!(request = %request_name, removed, "orphaned grants reclaimed");
        }
        Ok(removed)
    }

    async fn revoke_owned(&self, request_name: &str, namespaces: &[String]) -> AppResult<usize> {
        let mut removed = 0;
        for namespace in namespaces {
            let owned = self
                .grants
                .list_grants(namespace)
                .await?
                .into_iter()
                .filter(|grant| grant.is_owned_by(request_name));

            for grant in owned {
                match self
                    .grants
                    .delete_grant(namespace, grant.name.as_str())
                    .await
                {
                    Ok(()) => {
                        removed += 1;
                        info!(
                            request = %request_name,
                            namespace = %namespace,
                            grant = %grant.name,
                            "grant deleted"
                        );
                    }
                    Err(error) if error.is_not_found() => {}
                    Err(error) => return Err(error),
                }
            }
        }

        Ok(removed)
    }
}
