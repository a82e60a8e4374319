use std::sync::Arc;

use jitgate_core::{AppError, AppResult};
use jitgate_domain::{ConfigDocument, ConfigSnapshot};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::access_ports::{ConfigCache, ConfigSource};


/// Shared holder of the current configuration snapshot.
///
/// Readers clone an `Arc` to an immutable snapshot; a replace swaps the whole
/// reference, so no reader can observe a partially applied document.
#[derive(Clone, Default)]
pub struct ConfigSnapshotStore {
    current: Arc<RwLock<Option<Arc<ConfigSnapshot>>>>,
}

impl ConfigSnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot, failing when none has been loaded.
    pub async fn current(&self) -> AppResult<Arc<ConfigSnapshot>> {
        self.current.read().await.clone().ok_or_else(|| {
            AppError::Configuration("configuration snapshot has not been loaded".to_owned())
        })
    }

    /// Returns the version of the loaded snapshot, if any.
    pub async fn loaded_version(&self) -> Option<u64> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|snapshot| snapshot.version())
    }

    /// Validates and installs a document, returning the installed snapshot
    /// and whether it replaced a different document.
    ///
    /// An identical document keeps the existing snapshot and version. An
    /// invalid document leaves the current snapshot untouched.
    pub async fn replace(
        &self,
        document: ConfigDocument,
    ) -> AppResult<(Arc<ConfigSnapshot>, bool)> {
        let mut current = self.current.write().await;
        if let Some(existing) = current.as_ref()
            && existing.document() == &document
        {
            return Ok((existing.clone(), false));
        }

        let version = current
            .as_ref()
            .map_or(1, |existing| existing.version().saturating_add(1));
        let snapshot = Arc::new(ConfigSnapshot::new(document, version)?);
        *current = Some(snapshot.clone());

        Ok((snapshot, true))
    }
}

/// Loads configuration from its source into the snapshot store.
#[derive(Clone)]
pub struct ConfigService {
    source: Arc<dyn ConfigSource>,
    cache: Arc<dyn ConfigCache>,
    store: ConfigSnapshotStore,
}

impl ConfigService {
    /// Creates a configuration service.
    #[must_use]
    pub fn new(
        source: Arc<dyn ConfigSource>,
        cache: Arc<dyn ConfigCache>,
        store: ConfigSnapshotStore,
    ) -> Self {
        Self {
            source,
            cache,
            store,
        }
    }

    /// Returns the snapshot store fed by this service.
    #[must_use]
    pub fn store(&self) -> &ConfigSnapshotStore {
        &self.store
    }

    /// Installs the cached document, when one exists and is valid.
    pub async fn seed_from_cache(&self) -> AppResult<Option<Arc<ConfigSnapshot>>> {
        let Some(document) = self.cache.load().await? else {
            return Ok(None);
        };

        let (snapshot, _) = self.store.replace(document).await?;
        info!(version = snapshot.version(), "configuration seeded from cache");
        Ok(Some(snapshot))
    }

    /// Reads the configuration source and installs the result.
    ///
    /// A missing configuration object installs the built-in default. When
    /// the source is unreachable the last loaded snapshot stays in effect;
    /// without one the error propagates. A malformed document always
    /// propagates as a configuration error.
    pub async fn refresh(&self) -> AppResult<Arc<ConfigSnapshot>> {
        let document = match self.source.fetch_config().await {
            Ok(Some(document)) => document,
            Ok(None) => ConfigDocument::builtin_default(),
            Err(error) => {
                let current = self.store.current().await.map_err(|_| error)?;
                warn!(
                    version = current.version(),
                    "configuration source unavailable, keeping current snapshot"
                );
                return Ok(current);
            }
        };

        let (snapshot, changed) = self.store.replace(document).await?;
        if changed {
            info!(version = snapshot.version(), "configuration snapshot replaced");
            if let Err(error) = self.cache.store(snapshot.document()).await {
                warn!(error = %error, "failed to persist configuration cache");
            }
        }

        Ok(snapshot)
    }
}
