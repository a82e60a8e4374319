use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use jitgate_application::{GrantStore, NamespaceDirectory};
use jitgate_core::{AppError, AppResult};
use jitgate_domain::RoleGrant;
use reqwest::Method;

use super::KubernetesResourceStore;
use super::wire::{NamespaceObject, ObjectList, RoleBindingObject};
use crate::http_support::{check_response, decode_json, transport_error};

#[async_trait]
impl GrantStore for KubernetesResourceStore {
    async fn create_grant(&self, grant: &RoleGrant) -> AppResult<()> {
        let context = format!(
            "creating role binding '{}' in '{}' failed",
            grant.name, grant.namespace
        );
        let url = self.url(Self::role_bindings_path(grant.namespace.as_str()).as_str())?;
        let response = self
            .request(Method::POST, url)
            .json(&RoleBindingObject::from_domain(grant))
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;

        match check_response(response, context.as_str()).await {
            Ok(_) => Ok(()),
            Err(AppError::Conflict(message)) => Err(AppError::AlreadyExists(message)),
            Err(error) => Err(error),
        }
    }

    async fn list_grants(&self, namespace: &str) -> AppResult<Vec<RoleGrant>> {
        let context = format!("listing role bindings in '{namespace}' failed");
        let url = self.url(Self::role_bindings_path(namespace).as_str())?;
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;
        let response = match check_response(response, context.as_str()).await {
            Ok(response) => response,
            Err(error) if error.is_not_found() => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };
        let list: ObjectList<RoleBindingObject> =
            decode_json(response, context.as_str()).await?;

        Ok(list
            .items
            .into_iter()
            .map(|binding| binding.into_domain(namespace))
            .collect())
    }

    async fn delete_grant(&self, namespace: &str, name: &str) -> AppResult<()> {
        let context = format!("deleting role binding '{name}' in '{namespace}' failed");
        let url = self.url(format!("{}/{name}", Self::role_bindings_path(namespace)).as_str())?;
        let response = self
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;
        check_response(response, context.as_str()).await?;
        Ok(())
    }
}

#[async_trait]
impl NamespaceDirectory for KubernetesResourceStore {
    async fn list_namespaces_by_labels(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> AppResult<BTreeSet<String>> {
        let context = "listing namespaces by label failed";
        let selector = labels
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.url("api/v1/namespaces")?;
        url.query_pairs_mut().append_pair("labelSelector", selector.as_str());

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|error| transport_error(context, error))?;
        let response = check_response(response, context).await?;
        let list: ObjectList<NamespaceObject> = decode_json(response, context).await?;

        Ok(list
            .items
            .into_iter()
            .map(|namespace| namespace.metadata.name)
            .collect())
    }
}
