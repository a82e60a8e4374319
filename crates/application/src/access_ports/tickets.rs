use async_trait::async_trait;
use jitgate_core::AppResult;
use jitgate_domain::TicketDraft;

/// Port over the external issue tracker used as the approval gate.
///
/// Every call crosses the network. Remote failures surface as
/// `ExternalService`; callers must never retry `create_ticket` blindly.
#[async_trait]
pub trait TicketGateway: Send + Sync {
    /// Opens one ticket and returns its key.
    async fn create_ticket(&self, draft: &TicketDraft) -> AppResult<String>;

    /// Adds one comment to a ticket.
    async fn add_comment(&self, ticket_key: &str, body: &str) -> AppResult<()>;

    /// Moves a ticket through one workflow transition.
    async fn transition(&self, ticket_key: &str, transition_id: &str) -> AppResult<()>;

    /// Returns the workflow status name of a ticket.
    async fn ticket_status(&self, ticket_key: &str) -> AppResult<String>;

    /// Resolves an identity handle to an account, failing with `NotFound`
    /// when the tracker knows no such user. The first match wins.
    async fn resolve_account(&self, handle: &str) -> AppResult<String>;
}
