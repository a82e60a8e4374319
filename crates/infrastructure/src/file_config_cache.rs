use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jitgate_application::ConfigCache;
use jitgate_core::{AppError, AppResult};
use jitgate_domain::ConfigDocument;
use tracing::debug;

/// Configuration cache persisted as one JSON file.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so readers never see a partially written document.
pub struct FileConfigCache {
    path: PathBuf,
}

impl FileConfigCache {
    /// Creates a cache at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the cache file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn temporary_path(&self) -> PathBuf {
        let mut file_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "config.json".into());
        file_name.push(".tmp");
        self.path.with_file_name(file_name)
    }
}

fn io_error(action: &str, path: &Path, error: std::io::Error) -> AppError {
    AppError::Internal(format!(
        "failed to {action} configuration cache '{}': {error}",
        path.display()
    ))
}

#[async_trait]
impl ConfigCache for FileConfigCache {
    async fn load(&self) -> AppResult<Option<ConfigDocument>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error("read", &self.path, error)),
        };

        ConfigDocument::from_json(&bytes).map(Some)
    }

    async fn store(&self, document: &ConfigDocument) -> AppResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| io_error("create directory for", &self.path, error))?;
        }

        let temporary = self.temporary_path();
        tokio::fs::write(&temporary, document.to_json()?)
            .await
            .map_err(|error| io_error("write", &temporary, error))?;
        tokio::fs::rename(&temporary, &self.path)
            .await
            .map_err(|error| io_error("replace", &self.path, error))?;

        debug!(path = %self.path.display(), "configuration cache written");
        Ok(())
    }
}
