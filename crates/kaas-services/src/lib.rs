mod catalog;
mod controller;
mod ollama;
mod services;
mod store;

pub use catalog::{CatalogError, CatalogWorker, ModelCatalogService, OllamaCatalog};
pub use controller::ModelDialogController;
pub use ollama::{build_http_client, OllamaClient, OllamaError, OllamaModel};
pub use services::{Services, ServicesError};
pub use store::{ModelStore, StoreError};

// Re-export core types so front ends only import from services
pub use kaas_core::{
    CatalogStatus, DialogState, Field, FieldError, FieldErrors, KaasConfig, KaasError,
    ModelConfig, NewModelConfig, Provider, SubmitOutcome,
};
