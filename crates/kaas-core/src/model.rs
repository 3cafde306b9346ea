use serde::{Deserialize, Serialize};

use crate::Provider;

/// A model configuration that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewModelConfig {
    pub provider: Provider,
    pub alias: String,
    pub endpoint: String,
    pub model: String,
}

impl NewModelConfig {
    pub fn with_id(self, id: impl Into<String>) -> ModelConfig {
        ModelConfig {
            id: id.into(),
            provider: self.provider,
            alias: self.alias,
            endpoint: self.endpoint,
            model: self.model,
        }
    }
}

/// A persisted model configuration. `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub provider: Provider,
    pub alias: String,
    pub endpoint: String,
    pub model: String,
}

impl ModelConfig {
    pub fn fields(&self) -> NewModelConfig {
        NewModelConfig {
            provider: self.provider,
            alias: self.alias.clone(),
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
        }
    }

    /// Catalog lookup for this model's endpoint
    pub fn raw_config(&self) -> RawConfig {
        RawConfig::new(self.provider, self.endpoint.trim())
    }
}

/// Connection details needed to list a provider's models
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawConfig {
    pub provider: Provider,
    pub endpoint: String,
}

impl RawConfig {
    pub fn new(provider: Provider, endpoint: impl Into<String>) -> Self {
        Self {
            provider,
            endpoint: endpoint.into(),
        }
    }
}
