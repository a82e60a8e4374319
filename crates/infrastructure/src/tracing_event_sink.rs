use std::sync::Arc;

use async_trait::async_trait;
use jitgate_application::EventSink;
use jitgate_core::AppResult;
use jitgate_domain::{EventSeverity, LifecycleEvent};
use tracing::{info, warn};

/// Event sink that logs every event and optionally forwards it.
#[derive(Clone, Default)]
pub struct TracingEventSink {
    forward_to: Option<Arc<dyn EventSink>>,
}

impl TracingEventSink {
    /// Creates a log-only sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwards every logged event to another sink.
    #[must_use]
    pub fn with_forwarding(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.forward_to = Some(sink);
        self
    }
}

#[async_trait]
impl EventSink for TracingEventSink {
    async fn record(&self, event: LifecycleEvent) -> AppResult<()> {
        match event.severity {
            EventSeverity::Normal => info!(
                request = %event.subject,
                reason = event.reason.as_str(),
                message = %event.message,
                "lifecycle event"
            ),
            EventSeverity::Warning => warn!(
                request = %event.subject,
                reason = event.reason.as_str(),
                message = %event.message,
                "lifecycle event"
            ),
        }

        match self.forward_to.as_ref() {
            Some(sink) => sink.record(event).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use jitgate_application::EventSink;
    use jitgate_core::AppResult;
    use jitgate_domain::{EventReason, LifecycleEvent};
    use tokio::sync::Mutex;

    use super::TracingEventSink;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<LifecycleEvent>>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn record(&self, event: LifecycleEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    #[tokio::test]
    async fn events_are_forwarded() {
        let recording = Arc::new(RecordingSink::default());
        let sink = TracingEventSink::new().with_forwarding(recording.clone());

        let result = sink
            .record(LifecycleEvent::new(
                "jit-1",
                "uid-1",
                EventReason::PreApproved,
                "ClusterRole 'edit' is allowed",
            ))
            .await;

        assert!(result.is_ok());
        assert_eq!(recording.events.lock().await.len(), 1);
    }
}
