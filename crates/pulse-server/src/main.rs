use anyhow::Result;
use pulse_common::shutdown::cancel_on_signal;
use pulse_server::config::ServerConfig;
use pulse_server::server;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulse=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = ServerConfig::load(&config_path)?;

    let cancel = CancellationToken::new();
    cancel_on_signal(cancel.clone());
    server::run(config, cancel).await
}
