//! Application services and ports.

#![forbid(unsafe_code)]

mod access_ports;
mod config_service;
mod grant_manager;
mod lifecycle_engine;
mod policy_validator;
mod reconcile_scheduler;
mod retry_policy;
mod status_store;

#[cfg(test)]
mod test_support;

pub use access_ports::{
    Clock, ConfigCache, ConfigSource, EventSink, GrantStore, NamespaceDirectory, RequestStore,
    SystemClock, TicketGateway,
};
pub use config_service::{ConfigService, ConfigSnapshotStore};
pub use grant_manager::GrantManager;
pub use lifecycle_engine::{LifecycleDependencies, LifecycleEngine, ReconcileOutcome};
pub use policy_validator::{PolicyValidator, PolicyVerdict};
pub use reconcile_scheduler::{ReconcileScheduler, ReconcileTask, ReconcileTrigger};
pub use retry_policy::RetryPolicy;
pub use status_store::StatusStore;
