use super::Transport;
use anyhow::{Context, Result};
use async_trait::async_trait;
use pulse_common::crypto::{Encryptor, ENCRYPTION_HEADER, ENCRYPTION_SCHEME};
use pulse_common::Metric;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Reports each metric to `/update/` and the whole snapshot to `/updates/`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    encryptor: Option<Encryptor>,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        encryptor: Option<Encryptor>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .connect_timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            request_timeout,
            encryptor,
        })
    }

    async fn send_one(&self, metric: &Metric) -> Result<()> {
        self.client
            .post(format!("{}/update/", self.base_url))
            .timeout(self.request_timeout)
            .json(metric)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_batch(&self, metrics: &[Metric]) -> Result<()> {
        let plain = serde_json::to_vec(metrics)?;
        let mut request = self
            .client
            .post(format!("{}/updates/", self.base_url))
            .timeout(self.request_timeout)
            .header(CONTENT_TYPE, "application/json");
        let body = match &self.encryptor {
            Some(encryptor) => {
                request = request.header(ENCRYPTION_HEADER, ENCRYPTION_SCHEME);
                encryptor.encrypt(&plain)?
            }
            None => plain,
        };
        request.body(body).send().await?.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, metrics: &[Metric]) -> Result<()> {
        let mut failed = 0usize;
        for metric in metrics {
            if let Err(e) = self.send_one(metric).await {
                failed += 1;
                tracing::debug!(id = %metric.id, error = %e, "Single metric update failed");
            }
        }
        if failed > 0 {
            tracing::warn!(failed, total = metrics.len(), "Single metric updates failed");
        }

        self.send_batch(metrics)
            .await
            .context("Batch update failed")
    }
}
