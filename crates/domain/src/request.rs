use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire value recorded when a request was rejected before a ticket was opened.
pub const TICKET_SKIPPED: &str = "Skipped";

/// Lifecycle state of one access request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestState {
    /// No state has been recorded yet.
    #[default]
    New,
    /// Ticket opened and validated; waiting for the start instant.
    PreApproved,
    /// Access grants were provisioned; waiting for the end instant.
    Succeeded,
    /// Request failed policy or approval and is awaiting teardown.
    Rejected,
    /// A state value this controller does not recognize.
    Unrecognized(String),
}

impl RequestState {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "",
            Self::PreApproved => "PreApproved",
            Self::Succeeded => "Succeeded",
            Self::Rejected => "Rejected",
            Self::Unrecognized(value) => value.as_str(),
        }
    }

    /// Parses storage value. Unknown values are preserved rather than rejected.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "" => Self::New,
            "PreApproved" => Self::PreApproved,
            "Succeeded" => Self::Succeeded,
            "Rejected" => Self::Rejected,
            other => Self::Unrecognized(other.to_owned()),
        }
    }
}

impl From<String> for RequestState {
    fn from(value: String) -> Self {
        Self::parse(value.as_str())
    }
}

impl From<RequestState> for String {
    fn from(value: RequestState) -> Self {
        value.as_str().to_owned()
    }
}

impl Display for RequestState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => formatter.write_str("New"),
            other => formatter.write_str(other.as_str()),
        }
    }
}

/// Reference to the external approval ticket of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketRef {
    /// No ticket has been opened yet.
    #[default]
    Unassigned,
    /// Ticket creation was intentionally skipped; the request can only be rejected.
    Skipped,
    /// Key of an opened ticket.
    Issue(String),
}

impl TicketRef {
    /// Returns the ticket key when a ticket exists.
    #[must_use]
    pub fn issue_key(&self) -> Option<&str> {
        match self {
            Self::Issue(key) => Some(key.as_str()),
            Self::Unassigned | Self::Skipped => None,
        }
    }

    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unassigned => "",
            Self::Skipped => TICKET_SKIPPED,
            Self::Issue(key) => key.as_str(),
        }
    }
}

impl From<String> for TicketRef {
    fn from(value: String) -> Self {
        match value.trim() {
            "" => Self::Unassigned,
            TICKET_SKIPPED => Self::Skipped,
            key => Self::Issue(key.to_owned()),
        }
    }
}

impl From<TicketRef> for String {
    fn from(value: TicketRef) -> Self {
        value.as_str().to_owned()
    }
}

/// Immutable request payload submitted by the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JitRequestSpec {
    /// Email-like handle of the requester.
    pub reporter: String,
    /// Additional identities that receive the same grant.
    #[serde(default)]
    pub additional_user_emails: Vec<String>,
    /// Cluster role to bind.
    pub cluster_role: String,
    /// Target namespaces.
    pub namespaces: Vec<String>,
    /// Optional labels every target namespace must carry.
    #[serde(default)]
    pub namespace_labels: BTreeMap<String, String>,
    /// Start of the access window.
    pub start_time: DateTime<Utc>,
    /// End of the access window.
    pub end_time: DateTime<Utc>,
    /// Ticket field values keyed by configured field name.
    #[serde(default)]
    pub jira_fields: BTreeMap<String, String>,
}

impl JitRequestSpec {
    /// Returns grant subjects: the requester followed by additional identities.
    #[must_use]
    pub fn subjects(&self) -> Vec<String> {
        std::iter::once(self.reporter.clone())
            .chain(self.additional_user_emails.iter().cloned())
            .collect()
    }

    /// Returns whether the end instant is strictly after the start instant.
    #[must_use]
    pub fn has_valid_window(&self) -> bool {
        self.end_time > self.start_time
    }
}

/// Observed state owned by the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JitRequestStatus {
    /// Current lifecycle state.
    #[serde(default)]
    pub state: RequestState,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
    /// External ticket reference.
    #[serde(default)]
    pub jira_ticket: TicketRef,
    /// Start instant the engine reasoned about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// End instant the engine reasoned about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Status mutation applied by the status store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Target lifecycle state.
    pub state: RequestState,
    /// Human-readable message.
    pub message: String,
    /// Ticket reference to persist.
    pub ticket: TicketRef,
}

impl StatusUpdate {
    /// Creates one status update.
    #[must_use]
    pub fn new(state: RequestState, message: impl Into<String>, ticket: TicketRef) -> Self {
        Self {
            state,
            message: message.into(),
            ticket,
        }
    }
}

/// Access request as read from the resource store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JitRequest {
    /// Stable request name.
    pub name: String,
    /// Store-assigned unique identifier.
    pub uid: String,
    /// Optimistic-concurrency version token.
    pub resource_version: Option<String>,
    /// Immutable request payload.
    pub spec: JitRequestSpec,
    /// Engine-owned observed state.
    pub status: JitRequestStatus,
}

impl JitRequest {
    /// Applies a status update, mirroring the requested window into the status.
    pub fn apply_status(&mut self, update: &StatusUpdate) {
        self.status.state = update.state.clone();
        self.status.message = update.message.clone();
        self.status.jira_ticket = update.ticket.clone();
        self.status.start_time = Some(self.spec.start_time);
        self.status.end_time = Some(self.spec.end_time);
    }

    /// Returns the frozen start instant, falling back to the spec.
    #[must_use]
    pub fn window_start(&self) -> DateTime<Utc> {
        self.status.start_time.unwrap_or(self.spec.start_time)
    }

    /// Returns the frozen end instant, falling back to the spec.
    #[must_use]
    pub fn window_end(&self) -> DateTime<Utc> {
        self.status.end_time.unwrap_or(self.spec.end_time)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;

    fn sample_request() -> JitRequest {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).single();
        let start = start.unwrap_or_else(Utc::now);
        JitRequest {
            name: "jit-1".to_owned(),
            uid: "uid-1".to_owned(),
            resource_version: Some("1".to_owned()),
            spec: JitRequestSpec {
                reporter: "reporter@example.com".to_owned(),
                additional_user_emails: vec!["pair@example.com".to_owned()],
                cluster_role: "edit".to_owned(),
                namespaces: vec!["team-a".to_owned()],
                namespace_labels: BTreeMap::new(),
                start_time: start,
                end_time: start + Duration::hours(1),
                jira_fields: BTreeMap::new(),
            },
            status: JitRequestStatus::default(),
        }
    }

    #[test]
    fn state_roundtrip_storage_value() {
        for state in [
            RequestState::New,
            RequestState::PreApproved,
            RequestState::Succeeded,
            RequestState::Rejected,
        ] {
            assert_eq!(RequestState::parse(state.as_str()), state);
        }
    }

    #[test]
    fn unknown_state_is_preserved() {
        let state = RequestState::parse("Paused");
        assert_eq!(state, RequestState::Unrecognized("Paused".to_owned()));
        assert_eq!(state.as_str(), "Paused");
    }

    #[test]
    fn ticket_ref_parses_sentinel_and_keys() {
        assert_eq!(TicketRef::from(String::new()), TicketRef::Unassigned);
        assert_eq!(TicketRef::from("Skipped".to_owned()), TicketRef::Skipped);
        assert_eq!(
            TicketRef::from("IAM-7".to_owned()).issue_key(),
            Some("IAM-7")
        );
        assert_eq!(TicketRef::Skipped.issue_key(), None);
    }

    #[test]
    fn ticket_ref_stores_trimmed_key() {
        let ticket = TicketRef::from("  IAM-7\n".to_owned());
        assert_eq!(ticket, TicketRef::Issue("IAM-7".to_owned()));
        assert_eq!(String::from(ticket), "IAM-7");
        assert_eq!(TicketRef::from(" Skipped ".to_owned()), TicketRef::Skipped);
    }

    #[test]
    fn status_deserializes_from_empty_object() {
        let status: Result<JitRequestStatus, _> = serde_json::from_str("{}");
        assert!(status.is_ok());
        let status = status.unwrap_or_default();
        assert_eq!(status.state, RequestState::New);
        assert_eq!(status.jira_ticket, TicketRef::Unassigned);
    }

    #[test]
    fn apply_status_mirrors_window() {
        let mut request = sample_request();
        request.apply_status(&StatusUpdate::new(
            RequestState::PreApproved,
            "waiting",
            TicketRef::Issue("IAM-1".to_owned()),
        ));

        assert_eq!(request.status.start_time, Some(request.spec.start_time));
        assert_eq!(request.status.end_time, Some(request.spec.end_time));
        assert_eq!(request.window_end(), request.spec.end_time);
    }

    #[test]
    fn subjects_start_with_reporter() {
        let request = sample_request();
        assert_eq!(
            request.spec.subjects(),
            vec![
                "reporter@example.com".to_owned(),
                "pair@example.com".to_owned()
            ]
        );
    }

    proptest! {
        #[test]
        fn window_is_valid_only_when_end_after_start(offset_seconds in -86_400_i64..86_400) {
            let mut request = sample_request();
            request.spec.end_time = request.spec.start_time + Duration::seconds(offset_seconds);
            prop_assert_eq!(request.spec.has_valid_window(), offset_seconds > 0);
        }
    }
}
