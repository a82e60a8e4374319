use async_trait::async_trait;
use chrono::Utc;
use jitgate_application::EventSink;
use jitgate_core::AppResult;
use jitgate_domain::LifecycleEvent;
use reqwest::Method;
use serde_json::json;
use uuid::Uuid;

use super::KubernetesResourceStore;
use super::wire::REQUEST_API_VERSION;
use crate::http_support::{check_response, transport_error};

#[async_trait]
impl EventSink for KubernetesResourceStore {
    async fn record(&self, event: LifecycleEvent) -> AppResult<()> {
        let context = format!("recording event for '{}' failed", event.subject);
        let url = self.url(format!("api/v1/namespaces/{}/events", self.event_namespace).as_str())?;
        let now = Utc::now().to_rfc3339();
        let body = json!({
            "apiVersion": "v1",
            "kind": "Event",
            "metadata": {
                "name": format!("{}.{}", event.subject, Uuid::new_v4().simple()),
                "namespace": self.event_namespace,
            },
            "involvedObject": {
                "apiVersion": REQUEST_API_VERSION,
                "kind": "JitRequest",
                "name": event.subject,
                "namespace": self.request_namespace,
                "uid": event.subject_uid,
            },
            "reason": event.reason.as_str(),
            "message": event.message,
            "type": event.severity.as_str(),
            "source": { "component": "jitgate" },
            "firstTimestamp": now,
            "lastTimestamp": now,
            "count": 1,
        });

        let response = self
            .request(Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(|error| transport_error(context.as_str(), error))?;
        check_response(response, context.as_str()).await?;
        Ok(())
    }
}
