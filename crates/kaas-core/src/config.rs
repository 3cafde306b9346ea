use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CATALOG_TIMEOUT, DEFAULT_OLLAMA_ENDPOINT};
use crate::error::{KaasError, Result};

pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const ENV_DB_PATH: &str = "KAAS_DB_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KaasConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_CATALOG_TIMEOUT.as_secs(),
        }
    }
}

impl OllamaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Network proxy applied to catalog requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            protocol: "http".to_string(),
            host: String::new(),
            port: 0,
        }
    }
}

impl ProxyConfig {
    /// Proxy URL, or `None` when disabled or no host is set.
    pub fn url(&self) -> Option<String> {
        let host = self.host.trim();
        if !self.enabled || host.is_empty() {
            return None;
        }
        Some(format!("{}://{}:{}", self.protocol.trim(), host, self.port))
    }
}

impl KaasConfig {
    /// Read an optional JSON config file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            Some(path) => {
                return Err(KaasError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )))
            }
            None => KaasConfig::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var(ENV_OLLAMA_HOST).filter(|h| !h.is_empty()) {
            self.ollama.host = normalize_host(&host);
        }
        if let Some(path) = var(ENV_DB_PATH).filter(|p| !p.is_empty()) {
            self.storage.db_path = PathBuf::from(path);
        }
    }
}

/// `OLLAMA_HOST` is often set without a scheme (e.g. `0.0.0.0:11434`).
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        return host.to_string();
    }
    format!("http://{}", host)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kaas")
        .join("kaas.db")
}
