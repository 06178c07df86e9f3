use serde::Deserialize;
use std::path::PathBuf;

/// Durable storage settings, the `[storage]` table of the server config.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Database URL; takes precedence over `store_file`.
    #[serde(default)]
    pub database_dsn: Option<String>,
    /// JSON snapshot path used when no database is configured.
    #[serde(default)]
    pub store_file: Option<PathBuf>,
    /// Hydrate from the snapshot file at startup.
    #[serde(default = "default_restore")]
    pub restore: bool,
    /// Seconds between periodic snapshots; 0 disables them.
    #[serde(default = "default_store_interval")]
    pub store_interval_secs: u64,
}

fn default_restore() -> bool {
    true
}

fn default_store_interval() -> u64 {
    300
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_dsn: None,
            store_file: None,
            restore: default_restore(),
            store_interval_secs: default_store_interval(),
        }
    }
}
