use std::time::Duration;

use kaas_core::ProxyConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Ollama returned {0}")]
    Status(reqwest::StatusCode),
    #[error("Connection refused - is Ollama running?")]
    ConnectionRefused,
    #[error("Request timed out")]
    Timeout,
    #[error("Invalid proxy {url}: {source}")]
    InvalidProxy {
        url: String,
        source: reqwest::Error,
    },
}

/// HTTP client routed through `proxy` when it is enabled
pub fn build_http_client(proxy: &ProxyConfig) -> Result<reqwest::Client, OllamaError> {
    let mut builder = reqwest::Client::builder();
    if let Some(url) = proxy.url() {
        let proxy = reqwest::Proxy::all(&url)
            .map_err(|source| OllamaError::InvalidProxy { url: url.clone(), source })?;
        debug!(%url, "Using network proxy");
        builder = builder.proxy(proxy);
    }
    Ok(builder.build()?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    host: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OllamaClient {
    /// Client over an existing connection pool, see [`build_http_client`]
    pub fn with_client(
        client: reqwest::Client,
        host: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let host = host.into().trim_end_matches('/').to_string();
        Self {
            host,
            client,
            timeout,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn list_models(&self) -> Result<Vec<OllamaModel>, OllamaError> {
        let url = format!("{}/api/tags", self.host);
        debug!("Fetching models from Ollama API");

        let tags: TagsResponse = self.get_json(&url).await?;
        info!(count = tags.models.len(), "Fetched models from Ollama");
        Ok(tags.models)
    }

    #[instrument(skip(self))]
    pub async fn list_model_names(&self) -> Result<Vec<String>, OllamaError> {
        let models = self.list_models().await?;
        let names: Vec<String> = models.into_iter().map(|m| m.name).collect();
        debug!(models = ?names, "Model names");
        Ok(names)
    }

    #[instrument(skip(self), fields(host = %self.host))]
    pub async fn version(&self) -> Result<String, OllamaError> {
        let url = format!("{}/api/version", self.host);
        let response: VersionResponse = self.get_json(&url).await?;
        Ok(response.version)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, OllamaError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            error!(status = %response.status(), "Ollama request failed");
            return Err(OllamaError::Status(response.status()));
        }

        response.json().await.map_err(map_reqwest_error)
    }
}

/// Map reqwest errors to OllamaError, detecting connection failures
fn map_reqwest_error(e: reqwest::Error) -> OllamaError {
    if e.is_connect() {
        error!("Connection refused - Ollama not running?");
        return OllamaError::ConnectionRefused;
    }
    if e.is_timeout() {
        error!("Ollama request timed out");
        return OllamaError::Timeout;
    }

    error!("HTTP error: {}", e);
    OllamaError::Http(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_trailing_slash_trimmed() {
        let client = OllamaClient::with_client(
            reqwest::Client::new(),
            "http://localhost:11434/",
            Duration::from_secs(1),
        );
        assert_eq!(client.host(), "http://localhost:11434");
    }

    #[test]
    fn test_tags_response_parses() {
        let raw = r#"{"models":[
            {"name":"llama3:latest","modified_at":"2024-05-01T00:00:00Z","size":4661224676},
            {"name":"qwen2:7b"}
        ]}"#;
        let tags: TagsResponse = serde_json::from_str(raw).unwrap();
        let names: Vec<_> = tags.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["llama3:latest", "qwen2:7b"]);
        assert_eq!(tags.models[0].size, 4661224676);
    }

    #[test]
    fn test_proxy_client() {
        let mut proxy = ProxyConfig::default();
        assert!(build_http_client(&proxy).is_ok());

        proxy.enabled = true;
        proxy.host = "127.0.0.1".to_string();
        proxy.port = 3128;
        assert!(build_http_client(&proxy).is_ok());

        proxy.protocol = "gopher".to_string();
        let err = build_http_client(&proxy).unwrap_err();
        assert!(matches!(
            err,
            OllamaError::InvalidProxy { ref url, .. } if url == "gopher://127.0.0.1:3128"
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_error() {
        // Grab a free port, then close it so nothing is listening
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let host = format!("http://127.0.0.1:{}", port);
        let client = OllamaClient::with_client(reqwest::Client::new(), host, Duration::from_secs(2));
        let err = client.list_model_names().await.unwrap_err();
        assert!(matches!(
            err,
            OllamaError::ConnectionRefused | OllamaError::Timeout
        ));
    }
}
