use std::time::Duration;

use jitgate_core::{AppError, AppResult};
use url::Url;

use crate::http_support::{join, normalize_base_url};

mod config;
mod events;
mod grants;
mod requests;
mod wire;


/// Connection settings for the cluster API server.
#[derive(Debug, Clone)]
pub struct KubernetesConnection {
    /// API server base URL.
    pub api_url: String,
    /// Bearer token.
    pub token: String,
    /// Skips TLS verification, for development clusters only.
    pub accept_invalid_certs: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Resource-store adapter over the Kubernetes REST API.
///
/// Serves access requests, role bindings, namespaces, events and the
/// cluster-scoped configuration object.
pub struct KubernetesResourceStore {
    http_client: reqwest::Client,
    api_url: Url,
    token: String,
    request_namespace: String,
    event_namespace: String,
    config_name: String,
}

impl KubernetesResourceStore {
    /// Creates a store against one API server.
    pub fn new(connection: KubernetesConnection) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(connection.timeout)
            .danger_accept_invalid_certs(connection.accept_invalid_certs)
            .build()
            .map_err(|error| {
                AppError::Internal(format!("failed to build Kubernetes HTTP client: {error}"))
            })?;

        Ok(Self {
            http_client,
            api_url: normalize_base_url(connection.api_url.as_str(), "KUBE_API_URL")?,
            token: connection.token,
            request_namespace: "default".to_owned(),
            event_namespace: "default".to_owned(),
            config_name: "jitgate-config".to_owned(),
        })
    }

    /// Sets the namespace holding access request objects.
    #[must_use]
    pub fn with_request_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.request_namespace = namespace.into();
        self
    }

    /// Sets the namespace receiving lifecycle events.
    #[must_use]
    pub fn with_event_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.event_namespace = namespace.into();
        self
    }

    /// Sets the name of the configuration object.
    #[must_use]
    pub fn with_config_name(mut self, name: impl Into<String>) -> Self {
        self.config_name = name.into();
        self
    }

    fn url(&self, path: &str) -> AppResult<Url> {
        join(&self.api_url, path)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .bearer_auth(self.token.as_str())
            .header("Accept", "application/json")
    }

    fn requests_path(&self) -> String {
        format!(
            "apis/{}/namespaces/{}/jitrequests",
            wire::REQUEST_API_VERSION,
            self.request_namespace
        )
    }

    fn role_bindings_path(namespace: &str) -> String {
        format!(
            "apis/{}/v1/namespaces/{namespace}/rolebindings",
            wire::RBAC_API_GROUP
        )
    }
}
