use super::*;

impl LifecycleEngine {
    pub(super) async fn handle_rejected(
        &self,
        request: JitRequest,
        config: &ConfigSnapshot,
    ) -> AppResult<ReconcileOutcome> {
        let removed = self.grant_manager.revoke_grants(&request).await?;
        if removed > 0 {
            info!(request = %request.name, removed, "grants of rejected request revoked");
        }

        if let Some(key) = request.status.jira_ticket.issue_key() {
            self.reject_ticket(&request, key, config).await?;
        }

        self.delete_request(&request).await
    }

    /// Moves the ticket to its rejected state and comments once the transition lands.
    async fn reject_ticket(
        &self,
        request: &JitRequest,
        ticket_key: &str,
        config: &ConfigSnapshot,
    ) -> AppResult<()> {
        match self
            .tickets
            .transition(ticket_key, config.rejected_transition_id())
            .await
        {
            Ok(()) => {}
            Err(error) if error.is_not_found() => {
                warn!(
                    request = %request.name,
                    ticket = %ticket_key,
                    "approval ticket no longer exists, skipping rejection"
                );
                return Ok(());
            }
            Err(error) => return Err(error),
        }

        let comment = rejection_comment(request.status.message.as_str());
        if let Err(error) = self.tickets.add_comment(ticket_key, &comment).await {
            warn!(
                request = %request.name,
                ticket = %ticket_key,
                error = %error,
                "failed to comment on rejected ticket"
            );
        }

        info!(request = %request.name, ticket = %ticket_key, "approval ticket rejected");
        Ok(())
    }

    pub(super) async fn handle_succeeded(
        &self,
        request: JitRequest,
    ) -> AppResult<ReconcileOutcome> {
        if let Some(delay) = delay_until(request.window_end(), self.now()) {
            return Ok(ReconcileOutcome::RequeueAfter(delay));
        }

        let removed = self.grant_manager.revoke_grants(&request).await?;
        info!(request = %request.name, removed, "access window ended, grants revoked");
        self.delete_request(&request).await
    }

    async fn delete_request(&self, request: &JitRequest) -> AppResult<ReconcileOutcome> {
        match self.status_store.delete(request.name.as_str()).await {
            Ok(()) => info!(request = %request.name, "request deleted"),
            Err(error) if error.is_not_found() => {
                debug!(request = %request.name, "request already deleted");
            }
            Err(error) => return Err(error),
        }

        Ok(ReconcileOutcome::Done)
    }
}
