//! Wires collectors, the hand-off queue and the sender together.

use crate::config::AgentConfig;
use crate::sender::Sender;
use crate::transport::{HttpTransport, RpcTransport, Transport};
use anyhow::{Context, Result};
use pulse_collector::{Collector, MetricSource, RuntimeSource, SystemSource};
use pulse_common::crypto::Encryptor;
use pulse_common::Signer;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A collector blocks until the sender has taken its previous batch.
const QUEUE_CAPACITY: usize = 1;

/// gRPC when `grpc_address` is set, HTTP otherwise.
pub fn build_transport(config: &AgentConfig) -> Result<Box<dyn Transport>> {
    if let Some(endpoint) = config.grpc_endpoint() {
        tracing::info!(%endpoint, "Reporting over gRPC");
        return Ok(Box::new(RpcTransport::connect_lazy(
            &endpoint,
            config.request_timeout(),
        )?));
    }

    let encryptor = match &config.crypto_key {
        Some(path) => Some(Encryptor::from_pem_file(path).with_context(|| {
            format!("Failed to load public key '{}'", path.display())
        })?),
        None => None,
    };
    let base_url = config.http_base_url();
    tracing::info!(%base_url, encrypted = encryptor.is_some(), "Reporting over HTTP");
    Ok(Box::new(HttpTransport::new(
        base_url,
        config.request_timeout(),
        encryptor,
    )?))
}

pub fn default_sources() -> Result<Vec<Box<dyn MetricSource>>> {
    Ok(vec![
        Box::new(RuntimeSource::new()?),
        Box::new(SystemSource::new()),
    ])
}

pub async fn run(config: AgentConfig, cancel: CancellationToken) -> Result<()> {
    let transport = build_transport(&config)?;
    let sources = default_sources()?;
    run_with(
        sources,
        transport,
        Signer::new(&config.secret_key),
        config.poll_interval(),
        config.report_interval(),
        cancel,
    )
    .await;
    Ok(())
}

/// Runs one collector per source plus the sender until `cancel` fires and
/// every task has finished.
pub async fn run_with(
    sources: Vec<Box<dyn MetricSource>>,
    transport: Box<dyn Transport>,
    signer: Signer,
    poll_interval: Duration,
    report_interval: Duration,
    cancel: CancellationToken,
) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    let mut tasks = JoinSet::new();

    for source in sources {
        let collector = Collector::new(source, signer.clone(), poll_interval);
        tasks.spawn(collector.run(tx.clone(), cancel.clone()));
    }
    drop(tx);

    let sender = Sender::new(transport, signer, report_interval);
    tasks.spawn(sender.run(rx, cancel.clone()));

    tracing::info!(tasks = tasks.len(), "Agent started");
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "Agent task failed");
            cancel.cancel();
        }
    }
    tracing::info!("Agent stopped");
}
