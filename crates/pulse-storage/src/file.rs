use crate::error::{Result, StorageError};
use crate::PersistentStorage;
use async_trait::async_trait;
use pulse_common::{Metric, Repository};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Snapshot of the whole repository as one JSON array in a single file.
pub struct FileStorage {
    repo: Arc<Repository>,
    path: PathBuf,
    restore: bool,
    // serializes writers so a periodic save never interleaves with a write-through one
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(repo: Arc<Repository>, path: impl Into<PathBuf>, restore: bool) -> Self {
        Self {
            repo,
            path: path.into(),
            restore,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl PersistentStorage for FileStorage {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<()> {
        if !self.restore {
            tracing::info!(path = %self.path.display(), "Restore disabled, skipping snapshot");
            return Ok(());
        }

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No snapshot file yet");
                return Ok(());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let metrics: Vec<Metric> = serde_json::from_slice(&bytes)?;
        self.repo.clear();
        let applied = self.repo.from_metrics(&metrics);
        tracing::info!(path = %self.path.display(), count = applied, "Restored metrics from file");
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let body = serde_json::to_vec(&self.repo.to_metrics())?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), bytes = body.len(), "Snapshot written");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.save().await
    }
}
