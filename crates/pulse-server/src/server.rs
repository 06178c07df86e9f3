//! Server lifecycle: state assembly, listeners, periodic saver, shutdown.

use crate::app::build_http_app;
use crate::config::ServerConfig;
use crate::grpc::ip_filter_interceptor;
use crate::grpc::service::MetricServiceImpl;
use crate::ip_filter::IpFilter;
use crate::state::AppState;
use anyhow::{Context, Result};
use pulse_common::crypto::Decryptor;
use pulse_common::proto::metric_service_server::MetricServiceServer;
use pulse_common::{Repository, Signer};
use pulse_storage::{create_storage, run_saver};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server as TonicServer;

/// Builds the shared state and hydrates the repository from storage.
pub async fn build_state(config: ServerConfig) -> Result<AppState> {
    let signer = Signer::new(&config.secret_key);
    if !signer.is_enabled() {
        tracing::warn!("No secret key configured, metric signatures are not checked");
    }
    let repo = Arc::new(Repository::new(signer));

    let storage = create_storage(&config.storage, repo.clone()).await;
    if let Err(e) = storage.load().await {
        tracing::error!(backend = storage.backend(), error = %e, "Failed to load stored metrics");
    }

    let decryptor = match &config.crypto_key {
        Some(path) => Some(Arc::new(Decryptor::from_pem_file(path).with_context(|| {
            format!("Failed to load private key '{}'", path.display())
        })?)),
        None => None,
    };

    let ip_filter = Arc::new(IpFilter::from_cidr(config.trusted_subnet.as_deref()));

    Ok(AppState {
        repo,
        storage,
        decryptor,
        ip_filter,
        config: Arc::new(config),
    })
}

pub async fn serve_http(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, build_http_app(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .context("HTTP server error")
}

pub async fn serve_grpc(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "gRPC server listening");
    let interceptor = ip_filter_interceptor(state.ip_filter.clone());
    let service = MetricServiceServer::with_interceptor(MetricServiceImpl::new(state), interceptor);
    TonicServer::builder()
        .add_service(service)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), cancel.cancelled_owned())
        .await
        .context("gRPC server error")
}

/// Runs every server task until `cancel` fires or one of them fails, then
/// closes the storage (which performs a final save).
pub async fn run(config: ServerConfig, cancel: CancellationToken) -> Result<()> {
    let state = build_state(config).await?;
    let config = state.config.clone();

    let http_listener = TcpListener::bind(&config.http_address)
        .await
        .with_context(|| format!("Failed to bind HTTP address {}", config.http_address))?;
    let grpc_listener = match config.grpc_address.as_deref() {
        Some(addr) => Some(
            TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind gRPC address {addr}"))?,
        ),
        None => None,
    };

    let mut tasks = JoinSet::new();
    tasks.spawn(serve_http(http_listener, state.clone(), cancel.clone()));
    if let Some(listener) = grpc_listener {
        tasks.spawn(serve_grpc(listener, state.clone(), cancel.clone()));
    }
    let saver_storage = state.storage.clone();
    let store_interval = Duration::from_secs(config.storage.store_interval_secs);
    let saver_cancel = cancel.clone();
    tasks.spawn(async move {
        run_saver(saver_storage, store_interval, saver_cancel).await;
        Ok(())
    });

    tracing::info!(
        http = %config.http_address,
        grpc = config.grpc_address.as_deref().unwrap_or("-"),
        storage = state.storage.backend(),
        "pulse-server started"
    );

    let mut result = Ok(());
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.map_err(anyhow::Error::from).and_then(|r| r);
        if let Err(e) = outcome {
            tracing::error!(error = %e, "Server task failed, shutting down");
            cancel.cancel();
            if result.is_ok() {
                result = Err(e);
            }
        }
    }

    if let Err(e) = state.storage.close().await {
        tracing::error!(error = %e, "Final snapshot failed");
    }
    tracing::info!("pulse-server stopped");
    result
}
