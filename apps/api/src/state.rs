use std::sync::Arc;

use jitgate_application::{Clock, ConfigSnapshotStore, PolicyValidator};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub policy_validator: PolicyValidator,
    pub config_snapshots: ConfigSnapshotStore,
    pub clock: Arc<dyn Clock>,
}
