use crate::config::StorageConfig;
use crate::file::FileStorage;
use crate::noop::NoopStorage;
use crate::relational::RelationalStorage;
use crate::PersistentStorage;
use pulse_common::Repository;
use std::sync::Arc;

/// Picks the backend once at startup: database, then file, then no-op.
///
/// A database that cannot be reached degrades to the no-op backend rather
/// than aborting startup.
pub async fn create_storage(
    config: &StorageConfig,
    repo: Arc<Repository>,
) -> Arc<dyn PersistentStorage> {
    if let Some(dsn) = config.database_dsn.as_deref().filter(|d| !d.is_empty()) {
        return match RelationalStorage::connect(dsn, repo).await {
            Ok(storage) => Arc::new(storage),
            Err(e) => {
                tracing::error!(error = %e, "Database storage unavailable, falling back to no-op storage");
                Arc::new(NoopStorage::new())
            }
        };
    }

    if let Some(path) = config
        .store_file
        .as_ref()
        .filter(|p| !p.as_os_str().is_empty())
    {
        tracing::info!(path = %path.display(), restore = config.restore, "Using file storage");
        return Arc::new(FileStorage::new(repo, path.clone(), config.restore));
    }

    tracing::info!("No durable storage configured, metrics live in memory only");
    Arc::new(NoopStorage::new())
}
