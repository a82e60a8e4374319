use super::*;

impl LifecycleEngine {
    pub(super) async fn handle_new(
        &self,
        mut request: JitRequest,
        config: &ConfigSnapshot,
    ) -> AppResult<ReconcileOutcome> {
        if request.status.jira_ticket == TicketRef::Skipped {
            return self.handle_rejected(request, config).await;
        }

        if let Some(field) = missing_custom_field(&request.spec, config) {
            let message = format!("missing custom field: {field}");
            return self
                .reject(
                    &mut request,
                    EventReason::ValidationFailed,
                    message,
                    TicketRef::Skipped,
                )
                .await;
        }

        let ticket_key = match request.status.jira_ticket.issue_key() {
            Some(key) => key.to_owned(),
            None => match self.open_ticket(&mut request, config).await? {
                Some(key) => key,
                None => return Ok(ReconcileOutcome::Done),
            },
        };
        let ticket = TicketRef::Issue(ticket_key.clone());

        if !config.is_role_allowed(request.spec.cluster_role.as_str()) {
            let message = format!(
                "ClusterRole '{}' is not allowed",
                request.spec.cluster_role
            );
            return self
                .reject(&mut request, EventReason::ValidationFailed, message, ticket)
                .await;
        }

        if let Err(violation) = check_end_after_start(&request.spec) {
            return self
                .reject(
                    &mut request,
                    EventReason::ValidationFailed,
                    violation.message,
                    ticket,
                )
                .await;
        }

        let scopes = self
            .validator
            .validate_scopes(&request.spec, config, !self.labels_enforced_at_admission)
            .await?;
        if let PolicyVerdict::Denied(violation) = scopes {
            let message = format!(
                "Namespace(s) {} not validated | Error: {}",
                request.spec.namespaces.join(", "),
                violation.message
            );
            return self
                .reject(&mut request, EventReason::ValidationFailed, message, ticket)
                .await;
        }

        self.pre_approve(request, config, ticket_key).await
    }

    /// Opens the approval ticket and persists its key before anything else.
    ///
    /// Returns `None` when the request was rejected instead.
    async fn open_ticket(
        &self,
        request: &mut JitRequest,
        config: &ConfigSnapshot,
    ) -> AppResult<Option<String>> {
        let reporter_account = match self
            .tickets
            .resolve_account(request.spec.reporter.as_str())
            .await
        {
            Ok(account) => account,
            Err(AppError::NotFound(_)) => {
                let message = format!("failed to find reporter user: {}", request.spec.reporter);
                self.reject(
                    request,
                    EventReason::ValidationFailed,
                    message,
                    TicketRef::Skipped,
                )
                .await?;
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        let draft = TicketDraft::for_request(&request.spec, reporter_account, config);
        let key = self.tickets.create_ticket(&draft).await?;
        info!(request = %request.name, ticket = %key, "approval ticket created");

        self.status_store
            .update_status(
                request,
                StatusUpdate::new(
                    RequestState::New,
                    format!("Jira ticket {key} created"),
                    TicketRef::Issue(key.clone()),
                ),
            )
            .await?;

        Ok(Some(key))
    }
}
