//! Jitgate admission API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dto;
mod error;
mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use jitgate_application::{ConfigService, ConfigSnapshotStore, PolicyValidator, SystemClock};
use jitgate_core::AppError;
use jitgate_infrastructure::{
    FileConfigCache, JiraTicketGateway, KubernetesConnection, KubernetesResourceStore,
};
use tracing::{info, warn};

use crate::api_config::{ApiConfig, init_tracing};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let address = config.socket_address()?;

    let resource_store = Arc::new(
        KubernetesResourceStore::new(KubernetesConnection {
            api_url: config.kube_api_url.clone(),
            token: config.resolve_kube_token().await?,
            accept_invalid_certs: config.kube_accept_invalid_certs,
            timeout: config.kube_timeout,
        })?
        .with_config_name(config.config_name.as_str()),
    );
    let identities = Arc::new(JiraTicketGateway::new(
        config.jira_base_url.as_str(),
        config.jira_username.as_str(),
        config.jira_api_token.as_str(),
        config.jira_timeout,
    )?);

    let config_service = ConfigService::new(
        resource_store.clone(),
        Arc::new(FileConfigCache::new(config.config_cache_path.clone())),
        ConfigSnapshotStore::new(),
    );
    if let Err(error) = config_service.seed_from_cache().await {
        warn!(error = %error, "ignoring unreadable configuration cache");
    }
    if let Err(error) = config_service.refresh().await {
        warn!(error = %error, "initial configuration load failed");
    }

    let app_state = AppState {
        policy_validator: PolicyValidator::new(resource_store)
            .with_identity_resolution(identities, config.allow_self_approve),
        config_snapshots: config_service.store().clone(),
        clock: Arc::new(SystemClock),
    };

    tokio::spawn(refresh_config_periodically(
        config_service,
        config.config_refresh_interval,
    ));

    let app = api_router::build_router(app_state);
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind API listener: {error}")))?;

    info!(
        %address,
        allow_self_approve = config.allow_self_approve,
        "jitgate-api listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("API server failed: {error}")))
}

async fn refresh_config_periodically(config_service: ConfigService, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        if let Err(error) = config_service.refresh().await {
            warn!(error = %error, "configuration refresh failed");
        }
    }
}
