use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use jitgate_domain::JitRequest;

use crate::lifecycle_engine::ReconcileOutcome;

/// Why a request was scheduled for reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileTrigger {
    /// Seen for the first time.
    FirstSeen,
    /// Stored version changed since the last observation.
    Changed,
    /// A requested wake-up instant has passed.
    Due,
    /// No longer present in the store.
    Vanished,
}

impl ReconcileTrigger {
    /// Returns stable label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstSeen => "first_seen",
            Self::Changed => "changed",
            Self::Due => "due",
            Self::Vanished => "vanished",
        }
    }
}

/// One reconciliation to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileTask {
    /// Request name.
    pub name: String,
    /// Last known target namespaces, used for orphan clean-up.
    pub namespaces: Vec<String>,
    /// Scheduling reason.
    pub trigger: ReconcileTrigger,
}

#[derive(Debug, Clone)]
struct TrackedRequest {
    resource_version: Option<String>,
    namespaces: Vec<String>,
    due_at: Option<DateTime<Utc>>,
    vanished: bool,
}

/// Turns periodic store listings into change, wake-up and orphan triggers.
#[derive(Debug, Clone)]
pub struct ReconcileScheduler {
    tracked: BTreeMap<String, TrackedRequest>,
    error_backoff: Duration,
}

impl ReconcileScheduler {
    /// Creates a scheduler retrying failed reconciliations after `error_backoff`.
    #[must_use]
    pub fn new(error_backoff: Duration) -> Self {
        Self {
            tracked: BTreeMap::new(),
            error_backoff,
        }
    }

    /// Compares a listing with tracked state and returns the tasks to run.
    pub fn observe(&mut self, requests: &[JitRequest], now: DateTime<Utc>) -> Vec<ReconcileTask> {
        let mut tasks = Vec::new();
        let listed: BTreeSet<&str> = requests.iter().map(|request| request.name.as_str()).collect();

        for request in requests {
            let trigger = match self.tracked.get(request.name.as_str()) {
                None => Some(ReconcileTrigger::FirstSeen),
                Some(tracked) if tracked.vanished => Some(ReconcileTrigger::FirstSeen),
                Some(tracked) if tracked.resource_version != request.resource_version => {
                    Some(ReconcileTrigger::Changed)
                }
                Some(tracked) if tracked.due_at.is_some_and(|due_at| due_at <= now) => {
                    Some(ReconcileTrigger::Due)
                }
                Some(_) => None,
            };

            let entry = self
                .tracked
                .entry(request.name.clone())
                .or_insert_with(|| TrackedRequest {
                    resource_version: None,
                    namespaces: Vec::new(),
                    due_at: None,
                    vanished: false,
                });
            entry.resource_version = request.resource_version.clone();
            entry.namespaces = request.spec.namespaces.clone();
            entry.vanished = false;

            if let Some(trigger) = trigger {
                entry.due_at = None;
                tasks.push(ReconcileTask {
                    name: request.name.clone(),
                    namespaces: entry.namespaces.clone(),
                    trigger,
                });
            }
        }

        let gone: Vec<String> = self
            .tracked
            .iter()
            .filter(|(name, tracked)| {
                !listed.contains(name.as_str())
                    && (!tracked.vanished || tracked.due_at.is_none_or(|due_at| due_at <= now))
            })
            .map(|(name, _)| name.clone())
            .collect();

        for name in gone {
            if let Some(tracked) = self.tracked.remove(&name) {
                tasks.push(ReconcileTask {
                    name,
                    namespaces: tracked.namespaces,
                    trigger: ReconcileTrigger::Vanished,
                });
            }
        }

        tasks
    }

    /// Records a successful reconciliation.
    pub fn record_success(
        &mut self,
        task: &ReconcileTask,
        outcome: ReconcileOutcome,
        now: DateTime<Utc>,
    ) {
        let Some(tracked) = self.tracked.get_mut(task.name.as_str()) else {
            return;
        };

        tracked.due_at = match outcome {
            ReconcileOutcome::Done => None,
            ReconcileOutcome::RequeueAfter(delay) => Some(add_delay(now, delay)),
        };
    }

    /// Records a failed reconciliation; the task is retried after the error backoff.
    pub fn record_failure(&mut self, task: &ReconcileTask, now: DateTime<Utc>) {
        let due_at = Some(add_delay(now, self.error_backoff));
        let tracked = self
            .tracked
            .entry(task.name.clone())
            .or_insert_with(|| TrackedRequest {
                resource_version: None,
                namespaces: task.namespaces.clone(),
                due_at: None,
                vanished: true,
            });
        tracked.due_at = due_at;
    }

    /// Returns the delay until the earliest pending wake-up.
    #[must_use]
    pub fn next_due_in(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.tracked
            .values()
            .filter_map(|tracked| tracked.due_at)
            .min()
            .map(|due_at| (due_at - now).to_std().unwrap_or_default())
    }

    /// Returns the number of tracked requests.
    #[must_use]
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }
}

fn add_delay(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
