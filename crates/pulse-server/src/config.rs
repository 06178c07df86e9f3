use anyhow::{Context, Result};
use pulse_storage::StorageConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_address")]
    pub http_address: String,
    /// gRPC listener, served alongside HTTP when set.
    #[serde(default)]
    pub grpc_address: Option<String>,
    /// HMAC key shared with agents; empty disables signature checks.
    #[serde(default)]
    pub secret_key: String,
    /// PEM private key used to decrypt encrypted batch uploads.
    #[serde(default)]
    pub crypto_key: Option<PathBuf>,
    /// CIDR allowed to report through `X-Real-IP`; empty disables the filter.
    #[serde(default)]
    pub trusted_subnet: Option<String>,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_http_address() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_address: default_http_address(),
            grpc_address: None,
            secret_key: String::new(),
            crypto_key: None,
            trusted_subnet: None,
            storage: StorageConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the TOML file (defaults when it does not exist), then applies
    /// environment overrides.
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
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("ADDRESS") {
            self.http_address = v;
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
        if let Some(v) = lookup("TRUSTED_SUBNET") {
            self.trusted_subnet = non_empty(v);
        }
        if let Some(v) = lookup("DATABASE_DSN") {
            self.storage.database_dsn = non_empty(v);
        }
        if let Some(v) = lookup("STORE_FILE") {
            self.storage.store_file = non_empty(v).map(PathBuf::from);
        }
        if let Some(v) = lookup("RESTORE") {
            self.storage.restore = v
                .trim()
                .parse()
                .with_context(|| format!("RESTORE must be true or false, got '{v}'"))?;
        }
        if let Some(v) = lookup("STORE_INTERVAL") {
            self.storage.store_interval_secs = parse_secs(&v)
                .with_context(|| format!("STORE_INTERVAL must be whole seconds, got '{v}'"))?;
        }
        Ok(())
    }
}

fn non_empty(v: String) -> Option<String> {
    (!v.trim().is_empty()).then_some(v)
}

/// Accepts `10` or `10s`.
pub fn parse_secs(v: &str) -> Result<u64> {
    let v = v.trim();
    Ok(v.strip_suffix('s').unwrap_or(v).parse()?)
}
