//! Remote model catalog: the service seam and the worker running fetches

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use kaas_core::{CatalogRequest, CatalogResponse, KaasConfig, Provider, RawConfig};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::ollama::{build_http_client, OllamaClient, OllamaError};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Ollama(#[from] OllamaError),
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Lists the model identifiers an endpoint currently serves
#[async_trait]
pub trait ModelCatalogService: Send + Sync {
    async fn list(&self, config: &RawConfig) -> Result<Vec<String>, CatalogError>;
}

pub struct OllamaCatalog {
    client: reqwest::Client,
    timeout: Duration,
}

impl OllamaCatalog {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Catalog honouring the configured timeout and network proxy
    pub fn from_config(config: &KaasConfig) -> Result<Self, CatalogError> {
        let client = build_http_client(&config.proxy)?;
        Ok(Self::new(client, config.ollama.timeout()))
    }
}

#[async_trait]
impl ModelCatalogService for OllamaCatalog {
    #[instrument(skip(self), fields(endpoint = %config.endpoint))]
    async fn list(&self, config: &RawConfig) -> Result<Vec<String>, CatalogError> {
        match config.provider {
            Provider::Ollama => {
                let client =
                    OllamaClient::with_client(self.client.clone(), &config.endpoint, self.timeout);
                Ok(client.list_model_names().await?)
            }
        }
    }
}

/// Runs catalog fetches on a tokio runtime and queues their results.
///
/// Each form has at most one live fetch: dispatching a newer request for the
/// same form cancels the older task. Results are polled with
/// [`CatalogWorker::try_next`] from a UI loop or awaited with
/// [`CatalogWorker::next`].
pub struct CatalogWorker {
    service: Arc<dyn ModelCatalogService>,
    runtime: Handle,
    tx: mpsc::UnboundedSender<CatalogResponse>,
    rx: mpsc::UnboundedReceiver<CatalogResponse>,
    in_flight: Arc<DashMap<Uuid, (u64, CancellationToken)>>,
}

impl CatalogWorker {
    pub fn new(service: Arc<dyn ModelCatalogService>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            service,
            runtime,
            tx,
            rx,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    #[instrument(
        skip(self, request),
        fields(endpoint = %request.config.endpoint, generation = request.ticket.generation)
    )]
    pub fn dispatch(&self, request: CatalogRequest) {
        let form = request.ticket.form;
        let generation = request.ticket.generation;
        let token = CancellationToken::new();

        let replaced = self.in_flight.insert(form, (generation, token.clone()));
        if let Some((previous, superseded)) = replaced {
            debug!(previous, "Cancelling superseded catalog fetch");
            superseded.cancel();
        }

        let service = self.service.clone();
        let tx = self.tx.clone();
        let in_flight = self.in_flight.clone();

        self.runtime.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(generation, "Catalog fetch cancelled");
                    return;
                }
                result = service.list(&request.config) => result,
            };

            let response = CatalogResponse::new(&request, result.map_err(|e| e.to_string()));
            if tx.send(response).is_err() {
                debug!("Catalog worker dropped before fetch completed");
            }
            in_flight.remove_if(&form, |_, (current, _)| *current == generation);
        });
    }

    /// Cancel whatever is outstanding for `form`.
    pub fn cancel(&self, form: Uuid) {
        if let Some((_, (generation, token))) = self.in_flight.remove(&form) {
            debug!(%form, generation, "Cancelling catalog fetch");
            token.cancel();
        }
    }

    pub fn is_busy(&self, form: Uuid) -> bool {
        self.in_flight.contains_key(&form)
    }

    /// Next ready response without waiting
    pub fn try_next(&mut self) -> Option<CatalogResponse> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next response
    pub async fn next(&mut self) -> Option<CatalogResponse> {
        self.rx.recv().await
    }
}
