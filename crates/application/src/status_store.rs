use std::sync::Arc;

use jitgate_core::{AppError, AppResult};
use jitgate_domain::{JitRequest, StatusUpdate};
use tracing::{debug, warn};

use crate::access_ports::RequestStore;
use crate::retry_policy::RetryPolicy;


/// Applies status updates to requests under optimistic concurrency.
#[derive(Clone)]
pub struct StatusStore {
    requests: Arc<dyn RequestStore>,
    retry_policy: RetryPolicy,
}

impl StatusStore {
    /// Creates a status store.
    #[must_use]
    pub fn new(requests: Arc<dyn RequestStore>, retry_policy: RetryPolicy) -> Self {
        Self {
            requests,
            retry_policy,
        }
    }

    /// Writes the update, rereading and reapplying on version conflicts.
    ///
    /// On success `request` holds the stored object. Fails with
    /// `ConflictExhausted` once the retry policy is used up.
    pub async fn update_status(
        &self,
        request: &mut JitRequest,
        update: StatusUpdate,
    ) -> AppResult<()> {
        let mut attempt = 1;
        loop {
            let mut candidate = request.clone();
            candidate.apply_status(&update);

            match self.requests.replace_status(&candidate).await {
                Ok(stored) => {
                    debug!(
                        request = %stored.name,
                        state = %update.state,
                        attempt,
                        "request status updated"
                    );
                    *request = stored;
                    return Ok(());
                }
                Err(AppError::Conflict(message)) => {
                    if !self.retry_policy.allows_retry_after(attempt) {
                        return Err(AppError::ConflictExhausted {
                            attempts: attempt,
                            message,
                        });
                    }

                    let backoff = self.retry_policy.backoff_for(attempt);
                    warn!(
                        request = %request.name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "status update conflicted, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    *request = self.requests.get_request(request.name.as_str()).await?;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Deletes a request, failing with `NotFound` when it is already gone.
    pub async fn delete(&self, name: &str) -> AppResult<()> {
        self.requests.delete_request(name).await
    }
}
