use std::sync::Arc;
use std::time::Duration;

use jitgate_application::{
    Clock, ConfigService, LifecycleEngine, ReconcileOutcome, ReconcileScheduler, ReconcileTask,
    RequestStore,
};
use jitgate_core::AppResult;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Polling controller driving the lifecycle engine for every stored request.
pub struct ReconcileLoop {
    engine: LifecycleEngine,
    requests: Arc<dyn RequestStore>,
    config_service: ConfigService,
    clock: Arc<dyn Clock>,
    scheduler: ReconcileScheduler,
    permits: Arc<Semaphore>,
    poll_interval: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CycleSummary {
    reconciled: usize,
    failed: usize,
}

impl ReconcileLoop {
    pub fn new(
        engine: LifecycleEngine,
        requests: Arc<dyn RequestStore>,
        config_service: ConfigService,
        clock: Arc<dyn Clock>,
        scheduler: ReconcileScheduler,
    ) -> Self {
        Self {
            engine,
            requests,
            config_service,
            clock,
            scheduler,
            permits: Arc::new(Semaphore::new(1)),
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrent: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max_concurrent.max(1)));
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub async fn run(mut self) {
        loop {
            let wait = match self.run_cycle().await {
                Ok(summary) => {
                    if summary.reconciled > 0 || summary.failed > 0 {
                        info!(
                            reconciled = summary.reconciled,
                            failed = summary.failed,
                            tracked = self.scheduler.tracked_len(),
                            "reconcile cycle finished"
                        );
                    }
                    next_poll_delay(
                        self.poll_interval,
                        self.scheduler.next_due_in(self.clock.now()),
                    )
                }
                Err(error) => {
                    warn!(error = %error, "reconcile cycle skipped");
                    self.poll_interval
                }
            };

            tokio::time::sleep(wait).await;
        }
    }

    async fn run_cycle(&mut self) -> AppResult<CycleSummary> {
        if let Err(error) = self.config_service.refresh().await {
            if self.config_service.store().loaded_version().await.is_none() {
                return Err(error);
            }
            warn!(error = %error, "configuration refresh failed, keeping current snapshot");
        }

        let requests = self.requests.list_requests().await?;
        let tasks = self.scheduler.observe(&requests, self.clock.now());
        if tasks.is_empty() {
            return Ok(CycleSummary::default());
        }

        let mut running = JoinSet::new();
        for task in tasks {
            debug!(request = %task.name, trigger = task.trigger.as_str(), "scheduling reconcile");
            let engine = self.engine.clone();
            let permits = self.permits.clone();
            running.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = engine.reconcile(task.name.as_str(), &task.namespaces).await;
                (task, result)
            });
        }

        let mut summary = CycleSummary::default();
        while let Some(joined) = running.join_next().await {
            match joined {
                Ok((task, Ok(outcome))) => {
                    summary.reconciled = summary.reconciled.saturating_add(1);
                    self.record_success(&task, outcome);
                }
                Ok((task, Err(error))) => {
                    summary.failed = summary.failed.saturating_add(1);
                    warn!(
                        request = %task.name,
                        trigger = task.trigger.as_str(),
                        error = %error,
                        "reconcile failed"
                    );
                    self.scheduler.record_failure(&task, self.clock.now());
                }
                Err(error) => {
                    summary.failed = summary.failed.saturating_add(1);
                    warn!(error = %error, "reconcile task aborted");
                }
            }
        }

        Ok(summary)
    }

    fn record_success(&mut self, task: &ReconcileTask, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Done => debug!(request = %task.name, "reconcile done"),
            ReconcileOutcome::RequeueAfter(delay) => debug!(
                request = %task.name,
                requeue_after_secs = delay.as_secs(),
                "reconcile requeued"
            ),
        }
        self.scheduler
            .record_success(task, outcome, self.clock.now());
    }
}

/// Sleeps until the next poll or the earliest wake-up, whichever comes first.
fn next_poll_delay(poll_interval: Duration, next_due_in: Option<Duration>) -> Duration {
    next_due_in.map_or(poll_interval, |due_in| due_in.min(poll_interval))
}
