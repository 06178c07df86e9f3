//! Durable mirrors of the in-memory metric [`Repository`](pulse_common::Repository).
//!
//! A [`PersistentStorage`] is bound to one repository: `load` hydrates it at
//! startup, `save` writes its full snapshot, `close` performs a final save.
//! [`create_storage`] picks the backend from [`StorageConfig`].

pub mod config;
pub mod entities;
pub mod error;
pub mod factory;
pub mod file;
pub mod noop;
pub mod relational;
pub mod saver;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

pub use config::StorageConfig;
pub use error::{Result, StorageError};
pub use factory::create_storage;
pub use file::FileStorage;
pub use noop::NoopStorage;
pub use relational::RelationalStorage;
pub use saver::run_saver;

#[async_trait]
pub trait PersistentStorage: Send + Sync {
    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Replaces the repository contents with the stored snapshot.
    async fn load(&self) -> Result<()>;

    /// Writes the full repository snapshot.
    async fn save(&self) -> Result<()>;

    /// Health check of the underlying store.
    async fn ping(&self) -> Result<()>;

    /// Final save, then release of any held resources.
    async fn close(&self) -> Result<()>;
}
