//! Service container
//!
//! Services are shared; form and dialog state is owned by whoever drives a
//! [`ModelDialogController`].

use std::sync::Arc;

use kaas_core::{KaasConfig, ModelConfig, ModelFormDialog, NewModelConfig};
use thiserror::Error;
use tokio::runtime::Handle;

use crate::store::{ModelStore, StoreError};
use crate::{CatalogError, CatalogWorker, ModelCatalogService, ModelDialogController, OllamaCatalog};

#[derive(Error, Debug)]
pub enum ServicesError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub struct Services {
    pub catalog: Arc<dyn ModelCatalogService>,
    pub store: ModelStore,
    runtime: Handle,
}

impl Services {
    pub fn new(catalog: Arc<dyn ModelCatalogService>, store: ModelStore, runtime: Handle) -> Self {
        Self {
            catalog,
            store,
            runtime,
        }
    }

    /// Ollama catalog and on-disk store as configured
    pub fn from_config(config: &KaasConfig, runtime: Handle) -> Result<Self, ServicesError> {
        let store = ModelStore::open(&config.storage.db_path)?;
        let catalog = Arc::new(OllamaCatalog::from_config(config)?);
        Ok(Self::new(catalog, store, runtime))
    }

    pub fn catalog_worker(&self) -> CatalogWorker {
        CatalogWorker::new(self.catalog.clone(), self.runtime.clone())
    }

    pub fn new_model_dialog(
        &self,
        on_submit: impl FnMut(NewModelConfig) + 'static,
    ) -> ModelDialogController {
        let dialog = ModelFormDialog::new_model(on_submit);
        ModelDialogController::new(dialog, self.catalog_worker())
    }

    pub fn edit_model_dialog(
        &self,
        on_submit: impl FnMut(ModelConfig) + 'static,
        on_delete: impl FnMut(&ModelConfig) + 'static,
    ) -> ModelDialogController {
        let dialog = ModelFormDialog::edit_model(on_submit, on_delete);
        ModelDialogController::new(dialog, self.catalog_worker())
    }
}
