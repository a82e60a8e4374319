use async_trait::async_trait;
use jitgate_application::RequestStore;
use jitgate_core::AppResult;
use jitgate_domain::JitRequest;
use reqwest::Method;
use tracing::debug;

use super::KubernetesResourceStore;
use super::wire::{JitRequestObject, ObjectList};
use crate::http_support::{check_response, decode_json, transport_error};

#[async_trait]
impl RequestStore for KubernetesResourceStore {
    async fn list_requests(&self) -> AppResult<Vec<JitRequest>> {
        let context = "listing access requests failed";
        let url = self.url(self.requests_path().as_str())?;
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|error| transport_error(context, error))?;
        let response = check_response(response, context).await?;
        let list: ObjectList<JitRequestObject> = decode_json(response, context).await?;

        Ok(list
            .items
            .into_iter()
            .map(JitRequestObject::into_domain)
            .collect())
    }

    async fn get_request(&self, name: &str) -> AppResult<JitRequest> {
        let context = format!("reading access request '{name}' failed");
        let url = self.url(format!("{}/{name}", self.requests_path()).as_str())?;
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;
        let response = check_response(response, context.as_str()).await?;
        let object: JitRequestObject = decode_json(response, context.as_str()).await?;

        Ok(object.into_domain())
    }

    async fn replace_status(&self, request: &JitRequest) -> AppResult<JitRequest> {
        let context = format!("updating status of access request '{}' failed", request.name);
        let url = self.url(format!("{}/{}/status", self.requests_path(), request.name).as_str())?;
        let body = JitRequestObject::from_domain(request, self.request_namespace.as_str());
        let response = self
            .request(Method::PUT, url)
            .json(&body)
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;
        let response = check_response(response, context.as_str()).await?;
        let object: JitRequestObject = decode_json(response, context.as_str()).await?;

        debug!(
            request = %request.name,
            resource_version = object.metadata.resource_version.as_deref().unwrap_or_default(),
            "access request status replaced"
        );
        Ok(object.into_domain())
    }

    async fn delete_request(&self, name: &str) -> AppResult<()> {
        let context = format!("deleting access request '{name}' failed");
        let url = self.url(format!("{}/{name}", self.requests_path()).as_str())?;
        let response = self
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;
        check_response(response, context.as_str()).await?;
        Ok(())
    }
}
