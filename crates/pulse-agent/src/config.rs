use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Server HTTP address, with or without scheme.
    #[serde(default = "default_address")]
    pub address: String,
    /// Selects the RPC transport when set.
    #[serde(default)]
    pub grpc_address: Option<String>,
    #[serde(default)]
    pub secret_key: String,
    /// Server public key (PEM) used to encrypt batch uploads.
    #[serde(default)]
    pub crypto_key: Option<PathBuf>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    /// Timeout for each single-metric HTTP request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_report_interval() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    1000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            grpc_address: None,
            secret_key: String::new(),
            crypto_key: None,
            poll_interval_secs: default_poll_interval(),
            report_interval_secs: default_report_interval(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl AgentConfig {
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file '{path}'"))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file '{path}'"))?
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("ADDRESS") {
            self.address = v;
        }
        if let Some(v) = lookup("GRPC_ADDRESS") {
            self.grpc_address = non_empty(v);
        }
        if let Some(v) = lookup("KEY") {
            self.secret_key = v;
        }
        if let Some(v) = lookup("CRYPTO_KEY") {
            self.crypto_key = non_empty(v).map(PathBuf::from);
        }
        if let Some(v) = lookup("POLL_INTERVAL") {
            self.poll_interval_secs = parse_secs(&v)
                .with_context(|| format!("POLL_INTERVAL must be whole seconds, got '{v}'"))?;
        }
        if let Some(v) = lookup("REPORT_INTERVAL") {
            self.report_interval_secs = parse_secs(&v)
                .with_context(|| format!("REPORT_INTERVAL must be whole seconds, got '{v}'"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.poll_interval_secs > 0, "poll interval must be positive");
        anyhow::ensure!(self.report_interval_secs > 0, "report interval must be positive");
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Base URL of the HTTP API.
    pub fn http_base_url(&self) -> String {
        with_scheme(&self.address)
    }

    /// gRPC endpoint URI, if the RPC transport is selected.
    pub fn grpc_endpoint(&self) -> Option<String> {
        self.grpc_address.as_deref().map(with_scheme)
    }
}

fn with_scheme(addr: &str) -> String {
    let addr = addr.trim().trim_end_matches('/');
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    }
}

fn non_empty(v: String) -> Option<String> {
    (!v.trim().is_empty()).then_some(v)
}

/// Accepts `10` or `10s`.
fn parse_secs(v: &str) -> Result<u64> {
    let v = v.trim();
    Ok(v.strip_suffix('s').unwrap_or(v).parse()?)
}
