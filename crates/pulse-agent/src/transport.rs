//! Delivery of metric snapshots to the server.

mod http;
mod rpc;

pub use http::HttpTransport;
pub use rpc::RpcTransport;

use anyhow::Result;
use async_trait::async_trait;
use pulse_common::Metric;

#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Delivers one snapshot. Failures are not retried.
    async fn send(&self, metrics: &[Metric]) -> Result<()>;
}
