//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod file_config_cache;
mod http_support;
mod jira_ticket_gateway;
mod kubernetes_resource_store;
mod tracing_event_sink;

pub use file_config_cache::FileConfigCache;
pub use jira_ticket_gateway::JiraTicketGateway;
pub use kubernetes_resource_store::{KubernetesConnection, KubernetesResourceStore};
pub use tracing_event_sink::TracingEventSink;
