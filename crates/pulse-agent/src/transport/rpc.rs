use super::Transport;
use anyhow::{Context, Result};
use async_trait::async_trait;
use pulse_common::proto::metric_service_client::MetricServiceClient;
use pulse_common::wire::to_add_request;
use pulse_common::Metric;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

/// Reports the whole snapshot with one `AddMetric` call.
pub struct RpcTransport {
    client: MetricServiceClient<Channel>,
}

impl RpcTransport {
    /// The connection is established on first use and re-established after
    /// failures.
    pub fn connect_lazy(endpoint: &str, timeout: Duration) -> Result<Self> {
        let channel = Endpoint::from_shared(endpoint.to_string())
            .with_context(|| format!("Invalid gRPC endpoint '{endpoint}'"))?
            .connect_timeout(timeout)
            .timeout(timeout)
            .connect_lazy();
        Ok(Self {
            client: MetricServiceClient::new(channel),
        })
    }
}

#[async_trait]
impl Transport for RpcTransport {
    fn name(&self) -> &'static str {
        "grpc"
    }

    async fn send(&self, metrics: &[Metric]) -> Result<()> {
        let resp = self
            .client
            .clone()
            .add_metric(to_add_request(metrics))
            .await
            .context("AddMetric failed")?;
        tracing::debug!(accepted = resp.into_inner().accepted, "Metrics reported");
        Ok(())
    }
}
