use std::sync::Arc;

use chrono::{DateTime, Utc};
use jitgate_core::{AppError, AppResult};
use jitgate_domain::{
    ConfigSnapshot, FieldKind, JitRequestSpec, PolicyViolation, check_cluster_role,
    check_custom_fields, check_end_after_start, check_namespace_labels, check_namespace_pattern,
    check_start_in_future,
};

use crate::access_ports::{NamespaceDirectory, TicketGateway};


/// Outcome of evaluating admission policy against one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyVerdict {
    /// Every check passed.
    Admitted,
    /// The first failing check.
    Denied(PolicyViolation),
}

impl PolicyVerdict {
    /// Returns true when the request was admitted.
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

impl From<Result<(), PolicyViolation>> for PolicyVerdict {
    fn from(value: Result<(), PolicyViolation>) -> Self {
        match value {
            Ok(()) => Self::Admitted,
            Err(violation) => Self::Denied(violation),
        }
    }
}

/// Evaluates admission rules against a request and a configuration snapshot.
///
/// Checks run in a fixed order and the first failure wins. Remote lookups
/// only feed the scope-label and identity checks; their failures other than
/// `NotFound` propagate as errors rather than verdicts.
#[derive(Clone)]
pub struct PolicyValidator {
    namespaces: Arc<dyn NamespaceDirectory>,
    identities: Option<Arc<dyn TicketGateway>>,
    allow_self_approve: bool,
}

impl PolicyValidator {
    /// Creates a validator without identity checks.
    #[must_use]
    pub fn new(namespaces: Arc<dyn NamespaceDirectory>) -> Self {
        Self {
            namespaces,
            identities: None,
            allow_self_approve: false,
        }
    }

    /// Enables requester and user-field resolution through the ticket tracker.
    ///
    /// `allow_self_approve` is combined with the snapshot's own flag.
    #[must_use]
    pub fn with_identity_resolution(
        mut self,
        identities: Arc<dyn TicketGateway>,
        allow_self_approve: bool,
    ) -> Self {
        self.identities = Some(identities);
        self.allow_self_approve = allow_self_approve;
        self
    }

    /// Runs the full admission check sequence.
    pub async fn validate_admission(
        &self,
        spec: &JitRequestSpec,
        config: &ConfigSnapshot,
        now: DateTime<Utc>,
    ) -> AppResult<PolicyVerdict> {
        let static_checks = check_cluster_role(spec, config)
            .and_then(|()| check_start_in_future(spec, now))
            .and_then(|()| check_end_after_start(spec));
        if let Err(violation) = static_checks {
            return Ok(PolicyVerdict::Denied(violation));
        }

        let scopes = self.validate_scopes(spec, config, true).await?;
        if !scopes.is_admitted() {
            return Ok(scopes);
        }

        if let Err(violation) = check_custom_fields(spec, config) {
            return Ok(PolicyVerdict::Denied(violation));
        }

        self.validate_identities(spec, config).await
    }

    /// Checks namespaces against the allow pattern and, when requested, the
    /// label constraints.
    pub async fn validate_scopes(
        &self,
        spec: &JitRequestSpec,
        config: &ConfigSnapshot,
        include_labels: bool,
    ) -> AppResult<PolicyVerdict> {
        if let Err(violation) = check_namespace_pattern(spec, config) {
            return Ok(PolicyVerdict::Denied(violation));
        }

        if !include_labels || spec.namespace_labels.is_empty() {
            return Ok(PolicyVerdict::Admitted);
        }

        let matching = self
            .namespaces
            .list_namespaces_by_labels(&spec.namespace_labels)
            .await?;
        Ok(check_namespace_labels(spec, &matching).into())
    }

    async fn validate_identities(
        &self,
        spec: &JitRequestSpec,
        config: &ConfigSnapshot,
    ) -> AppResult<PolicyVerdict> {
        let Some(identities) = self.identities.as_ref() else {
            return Ok(PolicyVerdict::Admitted);
        };

        let reporter_account = match identities.resolve_account(spec.reporter.as_str()).await {
            Ok(account) => account,
            Err(AppError::NotFound(_)) => {
                return Ok(PolicyVerdict::Denied(PolicyViolation::new(
                    "spec.userEmail",
                    format!("failed to find reporter user: {}", spec.reporter),
                )));
            }
            Err(error) => return Err(error),
        };

        let self_approve = self.allow_self_approve || config.self_approval_enabled();
        let user_fields = config
            .custom_fields()
            .iter()
            .filter(|(_, settings)| settings.kind == FieldKind::User);

        for (field_name, _) in user_fields {
            let field_path = format!("spec.jiraFields.{field_name}");
            let value = spec
                .jira_fields
                .get(field_name)
                .map(String::as_str)
                .unwrap_or_default();

            let account = if value.trim().is_empty() {
                None
            } else {
                match identities.resolve_account(value).await {
                    Ok(account) => Some(account),
                    Err(AppError::NotFound(_)) => None,
                    Err(error) => return Err(error),
                }
            };

            let Some(account) = account else {
                return Ok(PolicyVerdict::Denied(PolicyViolation::new(
                    field_path,
                    format!("Jira user does not exist or failed to find user: {field_name}"),
                )));
            };

            if !self_approve && account == reporter_account {
                return Ok(PolicyVerdict::Denied(PolicyViolation::new(
                    field_path,
                    format!(
                        "Reporter '{}' cannot be the same as user field '{field_name}'",
                        spec.reporter
                    ),
                )));
            }
        }

        Ok(PolicyVerdict::Admitted)
    }
}
