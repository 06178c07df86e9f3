use anyhow::Result;
use pulse_agent::agent;
use pulse_agent::config::AgentConfig;
use pulse_common::shutdown::cancel_on_signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulse=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());
    let config = AgentConfig::load(&config_path)?;
    tracing::info!(
        poll_secs = config.poll_interval_secs,
        report_secs = config.report_interval_secs,
        signed = !config.secret_key.is_empty(),
        "pulse-agent starting"
    );

    let cancel = CancellationToken::new();
    cancel_on_signal(cancel.clone());
    agent::run(config, cancel).await
}
