use async_trait::async_trait;
use jitgate_core::AppResult;
use jitgate_domain::ConfigDocument;

/// Port reading the declarative configuration object.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Returns the configuration document, or `None` when none is defined.
    async fn fetch_config(&self) -> AppResult<Option<ConfigDocument>>;
}

/// Port persisting the last applied configuration locally.
#[async_trait]
pub trait ConfigCache: Send + Sync {
    /// Loads the cached document, if any.
    async fn load(&self) -> AppResult<Option<ConfigDocument>>;

    /// Atomically replaces the cached document.
    async fn store(&self, document: &ConfigDocument) -> AppResult<()>;
}
