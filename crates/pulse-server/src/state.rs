use crate::config::ServerConfig;
use crate::ip_filter::IpFilter;
use pulse_common::crypto::Decryptor;
use pulse_common::{Metric, MetricError, MetricKind, Repository};
use pulse_storage::{PersistentStorage, StorageError};
use std::sync::Arc;

/// Why a batch of updates was refused or not persisted.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("signature mismatch for metric {0}")]
    BadSignature(String),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub storage: Arc<dyn PersistentStorage>,
    pub decryptor: Option<Arc<Decryptor>>,
    pub ip_filter: Arc<IpFilter>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Checks every metric, applies them all, then saves write-through.
    ///
    /// Nothing is applied unless every metric carries a value and a valid
    /// signature. Returns the number of metrics applied.
    pub async fn ingest(&self, metrics: &[Metric]) -> Result<usize, IngestError> {
        for metric in metrics {
            let present = match metric.kind {
                MetricKind::Gauge => metric.value.is_some(),
                MetricKind::Counter => metric.delta.is_some(),
            };
            if !present {
                return Err(MetricError::MissingValue {
                    id: metric.id.clone(),
                    kind: metric.kind,
                }
                .into());
            }
            if !self.repo.signer().verify(metric) {
                return Err(IngestError::BadSignature(metric.id.clone()));
            }
        }

        for metric in metrics {
            self.repo.update_metric(metric)?;
        }
        self.storage.save().await?;
        Ok(metrics.len())
    }
}
