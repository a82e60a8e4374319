use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jitgate_core::{AppError, AppResult};
use jitgate_domain::{
    ConfigSnapshot, EventReason, GRANTED_MESSAGE, JitRequest, LifecycleEvent,
    PRE_APPROVAL_MESSAGE, RequestState, StatusUpdate, TicketDraft, TicketRef, check_end_after_start,
    completion_comment, missing_custom_field, pre_approval_comment, rejection_comment,
};
use tracing::{debug, info, warn};

use crate::access_ports::{Clock, EventSink, RequestStore, TicketGateway};
use crate::config_service::ConfigSnapshotStore;
use crate::grant_manager::GrantManager;
use crate::policy_validator::{PolicyValidator, PolicyVerdict};
use crate::status_store::StatusStore;

mod approval;
mod intake;
mod teardown;


/// Result of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing further to do until the request changes.
    Done,
    /// Reconcile again after the given delay. A zero delay is due immediately.
    RequeueAfter(Duration),
}

/// Collaborators driven by the lifecycle engine.
#[derive(Clone)]
pub struct LifecycleDependencies {
    /// Request reads.
    pub requests: Arc<dyn RequestStore>,
    /// Status writes and request deletion.
    pub status_store: StatusStore,
    /// Grant provisioning and reclamation.
    pub grant_manager: GrantManager,
    /// Scope checks.
    pub validator: PolicyValidator,
    /// Approval ticket tracker.
    pub tickets: Arc<dyn TicketGateway>,
    /// Observability events.
    pub events: Arc<dyn EventSink>,
    /// Shared configuration snapshot.
    pub config: ConfigSnapshotStore,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// State machine driving a request from submission to rejection or expiry.
///
/// Holds no per-request state between invocations. Every branch is safe to
/// re-enter: the persisted ticket reference guards ticket creation, grant
/// writes tolerate duplicates, and grants left by an interrupted approval
/// resume it instead of rejecting.
#[derive(Clone)]
pub struct LifecycleEngine {
    requests: Arc<dyn RequestStore>,
    status_store: StatusStore,
    grant_manager: GrantManager,
    validator: PolicyValidator,
    tickets: Arc<dyn TicketGateway>,
    events: Arc<dyn EventSink>,
    config: ConfigSnapshotStore,
    clock: Arc<dyn Clock>,
    labels_enforced_at_admission: bool,
}

impl LifecycleEngine {
    /// Creates a lifecycle engine.
    #[must_use]
    pub fn new(dependencies: LifecycleDependencies) -> Self {
        Self {
            requests: dependencies.requests,
            status_store: dependencies.status_store,
            grant_manager: dependencies.grant_manager,
            validator: dependencies.validator,
            tickets: dependencies.tickets,
            events: dependencies.events,
            config: dependencies.config,
            clock: dependencies.clock,
            labels_enforced_at_admission: false,
        }
    }

    /// Skips the namespace label check already enforced by the admission hook.
    #[must_use]
    pub fn with_labels_enforced_at_admission(mut self, enforced: bool) -> Self {
        self.labels_enforced_at_admission = enforced;
        self
    }

    /// Reconciles one request by name.
    ///
    /// `last_known_namespaces` drives orphan clean-up when the request has
    /// vanished from the store.
    pub async fn reconcile(
        &self,
        name: &str,
        last_known_namespaces: &[String],
    ) -> AppResult<ReconcileOutcome> {
        let request = match self.requests.get_request(name).await {
            Ok(request) => request,
            Err(AppError::NotFound(_)) => {
                self.grant_manager
                    .revoke_orphaned(name, last_known_namespaces)
                    .await?;
                debug!(request = %name, "request not found, orphan clean-up complete");
                return Ok(ReconcileOutcome::Done);
            }
            Err(error) => return Err(error),
        };

        let config = self.config.current().await?;

        debug!(
            request = %request.name,
            state = %request.status.state,
            config_version = config.version(),
            "reconciling request"
        );

        match request.status.state.clone() {
            RequestState::Rejected => self.handle_rejected(request, &config).await,
            RequestState::New => self.handle_new(request, &config).await,
            RequestState::PreApproved => self.handle_pre_approved(request, &config).await,
            RequestState::Succeeded => self.handle_succeeded(request).await,
            RequestState::Unrecognized(state) => {
                warn!(
                    request = %request.name,
                    state = %state,
                    "unrecognized request state, applying expiry handling"
                );
                self.handle_succeeded(request).await
            }
        }
    }

    async fn reject(
        &self,
        request: &mut JitRequest,
        reason: EventReason,
        message: String,
        ticket: TicketRef,
    ) -> AppResult<ReconcileOutcome> {
        info!(
            request = %request.name,
            reason = reason.as_str(),
            message = %message,
            "request rejected"
        );
        self.emit(request, reason, message.clone()).await;
        self.status_store
            .update_status(
                request,
                StatusUpdate::new(RequestState::Rejected, message, ticket),
            )
            .await?;
        Ok(ReconcileOutcome::Done)
    }

    async fn emit(&self, request: &JitRequest, reason: EventReason, message: String) {
        let event = LifecycleEvent::new(
            request.name.clone(),
            request.uid.clone(),
            reason,
            message,
        );
        if let Err(error) = self.events.record(event).await {
            warn!(
                request = %request.name,
                reason = reason.as_str(),
                error = %error,
                "failed to record lifecycle event"
            );
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Returns the delay until `target`, or `None` when it is not strictly after `now`.
fn delay_until(target: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
    if target <= now {
        return None;
    }

    (target - now).to_std().ok()
}
