/// Severity of a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    /// Informational.
    Normal,
    /// Policy violation or provisioning failure.
    Warning,
}

impl EventSeverity {
    /// Returns stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
        }
    }
}

/// Machine-readable event reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReason {
    /// Request failed a policy check.
    ValidationFailed,
    /// Request was pre-approved.
    PreApproved,
    /// Ticket was not approved at start time.
    TicketNotApproved,
    /// Grant provisioning failed.
    FailedGrant,
}

impl EventReason {
    /// Returns stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "ValidationFailed",
            Self::PreApproved => "PreApproved",
            Self::TicketNotApproved => "TicketNotApproved",
            Self::FailedGrant => "FailedGrant",
        }
    }

    /// Returns the severity implied by the reason.
    #[must_use]
    pub fn severity(&self) -> EventSeverity {
        match self {
            Self::PreApproved => EventSeverity::Normal,
            Self::ValidationFailed | Self::TicketNotApproved | Self::FailedGrant => {
                EventSeverity::Warning
            }
        }
    }
}

/// Structured observability record about one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Request name.
    pub subject: String,
    /// Request unique identifier.
    pub subject_uid: String,
    /// Event severity.
    pub severity: EventSeverity,
    /// Event reason.
    pub reason: EventReason,
    /// Human-readable detail.
    pub message: String,
}

impl LifecycleEvent {
    /// Creates an event with the severity implied by its reason.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        subject_uid: impl Into<String>,
        reason: EventReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            subject_uid: subject_uid.into(),
            severity: reason.severity(),
            reason,
            message: message.into(),
        }
    }
}
