//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod config;
mod event;
mod grant;
mod policy;
mod request;
mod ticket;

pub use config::{
    ConfigDocument, ConfigSnapshot, CustomFieldSettings, FieldKind, RequiredFields,
    TargetEnvironment,
};
pub use event::{EventReason, EventSeverity, LifecycleEvent};
pub use grant::{
    GRANT_EXPIRY_ANNOTATION, GRANT_OWNER_KIND, OwnerReference, RoleGrant, grant_name,
};
pub use policy::{
    PolicyViolation, check_cluster_role, check_custom_fields, check_end_after_start,
    check_namespace_labels, check_namespace_pattern, check_start_in_future, missing_custom_field,
};
pub use request::{
    JitRequest, JitRequestSpec, JitRequestStatus, RequestState, StatusUpdate, TICKET_SKIPPED,
    TicketRef,
};
pub use ticket::{
    AUTOMATED_LABEL, GRANTED_MESSAGE, OPERATOR_LABEL, PRE_APPROVAL_MESSAGE,
    TICKET_TIMESTAMP_FORMAT, TicketDraft, TicketFieldValue, completion_comment,
    format_ticket_time, pre_approval_comment, rejection_comment,
};
