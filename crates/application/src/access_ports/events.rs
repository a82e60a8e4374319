use async_trait::async_trait;
use jitgate_core::AppResult;
use jitgate_domain::LifecycleEvent;

/// Port publishing lifecycle events for external observability.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Records one event.
    async fn record(&self, event: LifecycleEvent) -> AppResult<()>;
}
