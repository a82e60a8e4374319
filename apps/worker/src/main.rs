//! Jitgate controller runtime.

#![forbid(unsafe_code)]

mod reconcile_loop;
mod worker_config;

use std::sync::Arc;

use jitgate_application::{
    Clock, ConfigService, ConfigSnapshotStore, EventSink, GrantManager, LifecycleDependencies,
    LifecycleEngine, PolicyValidator, ReconcileScheduler, RequestStore, RetryPolicy, StatusStore,
    SystemClock, TicketGateway,
};
use jitgate_core::AppError;
use jitgate_infrastructure::{
    FileConfigCache, JiraTicketGateway, KubernetesConnection, KubernetesResourceStore,
    TracingEventSink,
};
use tracing::{info, warn};

use crate::reconcile_loop::ReconcileLoop;
use crate::worker_config::{WorkerConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let token = config.kube_token.resolve().await?;

    let resource_store = Arc::new(
        KubernetesResourceStore::new(KubernetesConnection {
            api_url: config.kube_api_url.clone(),
            token,
            accept_invalid_certs: config.kube_accept_invalid_certs,
            timeout: config.kube_timeout,
        })?
        .with_request_namespace(config.request_namespace.as_str())
        .with_event_namespace(config.operator_namespace.as_str())
        .with_config_name(config.config_name.as_str()),
    );
    let tickets: Arc<dyn TicketGateway> = Arc::new(JiraTicketGateway::new(
        config.jira_base_url.as_str(),
        config.jira_username.as_str(),
        config.jira_api_token.as_str(),
        config.jira_timeout,
    )?);
    let events: Arc<dyn EventSink> =
        Arc::new(TracingEventSink::new().with_forwarding(resource_store.clone()));
    let requests: Arc<dyn RequestStore> = resource_store.clone();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let config_service = ConfigService::new(
        resource_store.clone(),
        Arc::new(FileConfigCache::new(config.config_cache_path.clone())),
        ConfigSnapshotStore::new(),
    );
    if let Err(error) = config_service.seed_from_cache().await {
        warn!(error = %error, "ignoring unreadable configuration cache");
    }

    let engine = LifecycleEngine::new(LifecycleDependencies {
        requests: requests.clone(),
        status_store: StatusStore::new(
            requests.clone(),
            RetryPolicy::new(
                config.status_update_max_attempts,
                config.status_update_backoff,
            ),
        ),
        grant_manager: GrantManager::new(resource_store.clone()),
        validator: PolicyValidator::new(resource_store.clone()),
        tickets,
        events,
        config: config_service.store().clone(),
        clock: clock.clone(),
    })
    .with_labels_enforced_at_admission(config.webhooks_enabled);

    info!(
        kube_api_url = %config.kube_api_url,
        request_namespace = %config.request_namespace,
        operator_namespace = %config.operator_namespace,
        config_name = %config.config_name,
        webhooks_enabled = config.webhooks_enabled,
        poll_interval = ?config.poll_interval,
        max_concurrent_reconciles = config.max_concurrent_reconciles,
        "jitgate-worker started"
    );

    ReconcileLoop::new(
        engine,
        requests,
        config_service,
        clock,
        ReconcileScheduler::new(config.error_backoff),
    )
    .with_max_concurrency(config.max_concurrent_reconciles)
    .with_poll_interval(config.poll_interval)
    .run()
    .await;

    Ok(())
}
