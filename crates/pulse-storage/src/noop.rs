use crate::error::{Result, StorageError};
use crate::PersistentStorage;
use async_trait::async_trait;

/// Keeps nothing; used when no durable store is configured or reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStorage;

impl NoopStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PersistentStorage for NoopStorage {
    fn backend(&self) -> &'static str {
        "noop"
    }

    async fn load(&self) -> Result<()> {
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Err(StorageError::Unsupported {
            backend: self.backend(),
            operation: "ping",
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
