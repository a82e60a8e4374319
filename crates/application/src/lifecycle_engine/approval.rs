use super::*;

impl LifecycleEngine {
    pub(super) async fn pre_approve(
        &self,
        mut request: JitRequest,
        config: &ConfigSnapshot,
        ticket_key: String,
    ) -> AppResult<ReconcileOutcome> {
        let start = request.spec.start_time;
        let ticket = TicketRef::Issue(ticket_key.clone());

        let Some(delay) = delay_until(start, self.now()) else {
            let message = format!("start time {} must be after current time", start.to_rfc3339());
            return self
                .reject(&mut request, EventReason::ValidationFailed, message, ticket)
                .await;
        };

        self.tickets
            .add_comment(
                ticket_key.as_str(),
                &pre_approval_comment(&request.spec, config.additional_comment_text()),
            )
            .await?;

        self.emit(
            &request,
            EventReason::PreApproved,
            format!(
                "ClusterRole '{}' is allowed\nJira: {ticket_key}",
                request.spec.cluster_role
            ),
        )
        .await;

        self.status_store
            .update_status(
                &mut request,
                StatusUpdate::new(RequestState::PreApproved, PRE_APPROVAL_MESSAGE, ticket),
            )
            .await?;

        info!(
            request = %request.name,
            ticket = %ticket_key,
            requeue_after_secs = delay.as_secs(),
            "request pre-approved"
        );
        Ok(ReconcileOutcome::RequeueAfter(delay))
    }

    pub(super) async fn handle_pre_approved(
        &self,
        mut request: JitRequest,
        config: &ConfigSnapshot,
    ) -> AppResult<ReconcileOutcome> {
        if let Some(delay) = delay_until(request.window_start(), self.now()) {
            return Ok(ReconcileOutcome::RequeueAfter(delay));
        }

        let ticket = request.status.jira_ticket.clone();
        let approved = match ticket.issue_key() {
            Some(key) => self.is_approved(&request, key, config).await?,
            None => false,
        };

        if !approved {
            // Grants only exist once approval was observed; a failed status
            // write after completing the ticket leaves the request here.
            if self.grant_manager.has_grants(&request).await? {
                info!(
                    request = %request.name,
                    "grants already provisioned, resuming completed approval"
                );
                self.provision(&request).await?;
                return self.record_granted(request, ticket).await;
            }

            return self
                .reject(
                    &mut request,
                    EventReason::TicketNotApproved,
                    "Jira ticket has not been approved".to_owned(),
                    ticket,
                )
                .await;
        }

        self.provision(&request).await?;

        if let Some(key) = ticket.issue_key() {
            match self.complete_ticket(key, config).await {
                Ok(()) => {}
                Err(error) if error.is_not_found() => warn!(
                    request = %request.name,
                    ticket = %key,
                    "approval ticket vanished before completion"
                ),
                Err(error) => return Err(error),
            }
        }

        self.record_granted(request, ticket).await
    }

    async fn is_approved(
        &self,
        request: &JitRequest,
        ticket_key: &str,
        config: &ConfigSnapshot,
    ) -> AppResult<bool> {
        match self.tickets.ticket_status(ticket_key).await {
            Ok(status) => Ok(status == config.approve_status()),
            Err(error) if error.is_not_found() => {
                warn!(
                    request = %request.name,
                    ticket = %ticket_key,
                    "approval ticket no longer exists"
                );
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    async fn complete_ticket(&self, ticket_key: &str, config: &ConfigSnapshot) -> AppResult<()> {
        self.tickets
            .add_comment(ticket_key, &completion_comment())
            .await?;
        self.tickets
            .transition(ticket_key, config.completed_transition_id())
            .await
    }

    async fn provision(&self, request: &JitRequest) -> AppResult<()> {
        if let Err(error) = self.grant_manager.ensure_grants(request).await {
            self.emit(request, EventReason::FailedGrant, error.to_string())
                .await;
            return Err(error);
        }

        Ok(())
    }

    async fn record_granted(
        &self,
        mut request: JitRequest,
        ticket: TicketRef,
    ) -> AppResult<ReconcileOutcome> {
        self.status_store
            .update_status(
                &mut request,
                StatusUpdate::new(RequestState::Succeeded, GRANTED_MESSAGE, ticket),
            )
            .await?;
        info!(request = %request.name, "access granted");

        self.handle_succeeded(request).await
    }
}
