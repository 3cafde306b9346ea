// Domain modules
pub mod catalog;
pub mod config;
pub mod constants;
pub mod dialog;
pub mod error;
pub mod form;
pub mod model;
pub mod provider;
pub mod schema;

pub use catalog::{CatalogRequest, CatalogResponse, CatalogStatus, ModelCatalog, Ticket};
pub use config::{KaasConfig, OllamaConfig, ProxyConfig, StorageConfig};
pub use dialog::{DialogState, ModelFormDialog, SubmitOutcome};
pub use error::{KaasError, Result};
pub use form::{Field, FieldKind, FormMode, FormValues, ModelForm};
pub use model::{ModelConfig, NewModelConfig, RawConfig};
pub use provider::Provider;
pub use schema::{FieldError, FieldErrors, Submission, ValidationSchema};
