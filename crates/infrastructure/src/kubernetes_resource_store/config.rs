use async_trait::async_trait;
use jitgate_application::ConfigSource;
use jitgate_core::AppResult;
use jitgate_domain::ConfigDocument;
use reqwest::Method;

use super::KubernetesResourceStore;
use super::wire::{ConfigObject, REQUEST_API_VERSION};
use crate::http_support::{check_response, decode_json, transport_error};

#[async_trait]
impl ConfigSource for KubernetesResourceStore {
    async fn fetch_config(&self) -> AppResult<Option<ConfigDocument>> {
        let context = format!("reading configuration '{}' failed", self.config_name);
        let url = self.url(
            format!(
                "apis/{REQUEST_API_VERSION}/justintimeconfigs/{}",
                self.config_name
            )
            .as_str(),
        )?;
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;
        let response = match check_response(response, context.as_str()).await {
            Ok(response) => response,
            Err(error) if error.is_not_found() => return Ok(None),
            Err(error) => return Err(error),
        };
        let object: ConfigObject = decode_json(response, context.as_str()).await?;

        object.into_document().map(Some)
    }
}
