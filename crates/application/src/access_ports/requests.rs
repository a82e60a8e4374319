use async_trait::async_trait;
use jitgate_core::AppResult;
use jitgate_domain::JitRequest;

/// Resource-store port for access request objects.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Lists every live access request.
    async fn list_requests(&self) -> AppResult<Vec<JitRequest>>;

    /// Returns one request by name, failing with `NotFound` when absent.
    async fn get_request(&self, name: &str) -> AppResult<JitRequest>;

    /// Replaces the status of a request.
    ///
    /// Fails with `Conflict` when the stored version differs from
    /// `request.resource_version`. Returns the stored request with its new
    /// version token.
    async fn replace_status(&self, request: &JitRequest) -> AppResult<JitRequest>;

    /// Deletes one request, failing with `NotFound` when absent.
    async fn delete_request(&self, name: &str) -> AppResult<()>;
}
