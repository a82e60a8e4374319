use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::config::{ConfigSnapshot, CustomFieldSettings, FieldKind};
use crate::request::JitRequestSpec;

/// Timestamp layout expected by date-typed ticket fields.
pub const TICKET_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Label identifying tickets opened by this controller.
pub const OPERATOR_LABEL: &str = "jitgate";

/// Label marking tickets as machine-generated.
pub const AUTOMATED_LABEL: &str = "automated_jit_request";

/// Status message recorded on pre-approval and used as comment heading.
pub const PRE_APPROVAL_MESSAGE: &str =
    "Pre-approval - Access will be granted at start time pending human approval(s)";

/// Status message recorded once grants are provisioned.
pub const GRANTED_MESSAGE: &str = "Access granted until end time";

const GREEN: &str = "#00875a";
const RED: &str = "#de350b";

/// One typed ticket field value, encoded per its configured kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketFieldValue {
    /// External field identifier.
    pub field_id: String,
    /// Encoding kind.
    pub kind: FieldKind,
    /// Raw textual value.
    pub value: String,
}

impl TicketFieldValue {
    /// Creates a value for one configured field mapping.
    #[must_use]
    pub fn new(settings: &CustomFieldSettings, value: impl Into<String>) -> Self {
        Self {
            field_id: settings.jira_custom_field.clone(),
            kind: settings.kind,
            value: value.into(),
        }
    }

    /// Encodes the value for an issue-create payload.
    #[must_use]
    pub fn encode(&self) -> Value {
        match self.kind {
            FieldKind::Text | FieldKind::Date => Value::String(self.value.clone()),
            FieldKind::Select => json!({ "value": self.value }),
            FieldKind::User => json!({ "name": self.value }),
        }
    }
}

/// Everything needed to open one approval ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketDraft {
    /// Project key.
    pub project: String,
    /// Issue type name.
    pub issue_type: String,
    /// Ticket title.
    pub summary: String,
    /// Resolved external account of the requester.
    pub reporter_account: String,
    /// Ticket labels.
    pub labels: Vec<String>,
    /// Typed field values.
    pub fields: Vec<TicketFieldValue>,
}

impl TicketDraft {
    /// Builds the ticket for a request against a configuration snapshot.
    #[must_use]
    pub fn for_request(
        spec: &JitRequestSpec,
        reporter_account: impl Into<String>,
        config: &ConfigSnapshot,
    ) -> Self {
        let document = config.document();
        let required = &document.required_fields;

        let mut labels = document.labels.clone();
        labels.push(OPERATOR_LABEL.to_owned());
        labels.push(AUTOMATED_LABEL.to_owned());
        labels.push(document.environment.cluster.clone());
        labels.push(document.environment.environment.clone());
        labels.retain(|label| !label.trim().is_empty());

        let mut fields = vec![
            TicketFieldValue::new(&required.cluster_role, spec.cluster_role.clone()),
            TicketFieldValue::new(&required.start_time, format_ticket_time(spec.start_time)),
            TicketFieldValue::new(&required.end_time, format_ticket_time(spec.end_time)),
        ];
        fields.extend(document.custom_fields.iter().map(|(name, settings)| {
            let value = spec.jira_fields.get(name).cloned().unwrap_or_default();
            TicketFieldValue::new(settings, value)
        }));

        Self {
            project: document.jira_project.clone(),
            issue_type: document.jira_issue_type.clone(),
            summary: format!("Automated JIT request for {}", spec.reporter),
            reporter_account: reporter_account.into(),
            labels,
            fields,
        }
    }
}

/// Formats an instant for date-typed ticket fields.
#[must_use]
pub fn format_ticket_time(instant: DateTime<Utc>) -> String {
    instant.format(TICKET_TIMESTAMP_FORMAT).to_string()
}

fn colored(color: &str, text: &str) -> String {
    format!("{{color:{color}}}*{text}*{{color}}")
}

/// Builds the comment posted when a request is pre-approved.
#[must_use]
pub fn pre_approval_comment(spec: &JitRequestSpec, additional_info: &str) -> String {
    let mut comment = format!(
        "{}\n|*Namespace(s)*|{}|\n|*User*|{}|",
        colored(GREEN, PRE_APPROVAL_MESSAGE),
        spec.namespaces.join("\n"),
        spec.reporter
    );

    if !spec.additional_user_emails.is_empty() {
        comment.push_str("\n|*Additional Users*|");
        comment.push_str(&spec.additional_user_emails.join("\n"));
        comment.push('|');
    }

    if !additional_info.is_empty() {
        comment.push_str("\n\n*Additional Info:*\n");
        comment.push_str(additional_info);
    }

    comment
}

/// Builds the comment posted when access is provisioned.
#[must_use]
pub fn completion_comment() -> String {
    colored(GREEN, &format!("Completed - {GRANTED_MESSAGE}"))
}

/// Builds the comment posted when a request is rejected.
#[must_use]
pub fn rejection_comment(message: &str) -> String {
    colored(RED, &format!("Rejected - {message}"))
}
