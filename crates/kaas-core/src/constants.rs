//! Provider ids and Ollama defaults.

use std::time::Duration;

// Providers
pub const PROVIDER_OLLAMA: &str = "Ollama";

// Ollama
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(30);
