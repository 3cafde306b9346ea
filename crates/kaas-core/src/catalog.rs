//! Form-side view of a provider's remote model catalog
//!
//! The catalog tracks the endpoint the form is currently watching. Every
//! change of endpoint bumps a generation counter and issues a new
//! [`CatalogRequest`]; only the response carrying the latest [`Ticket`] is
//! applied, so a slow fetch for a previous endpoint can never overwrite the
//! catalog of the current one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RawConfig;

/// Identifies one fetch issued by one form instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    pub form: Uuid,
    pub generation: u64,
}

/// A fetch the owner should run against the catalog service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    pub ticket: Ticket,
    pub config: RawConfig,
}

/// Outcome of a [`CatalogRequest`], fed back into the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogResponse {
    pub ticket: Ticket,
    pub endpoint: String,
    pub result: Result<Vec<String>, String>,
}

impl CatalogResponse {
    pub fn new(request: &CatalogRequest, result: Result<Vec<String>, String>) -> Self {
        Self {
            ticket: request.ticket,
            endpoint: request.config.endpoint.clone(),
            result,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CatalogStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Fetch failed; cached suggestions (if any) are stale.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    form: Uuid,
    generation: u64,
    endpoint: String,
    status: CatalogStatus,
    cache: HashMap<String, Vec<String>>,
}

impl ModelCatalog {
    pub fn new(form: Uuid) -> Self {
        Self {
            form,
            generation: 0,
            endpoint: String::new(),
            status: CatalogStatus::Idle,
            cache: HashMap::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn status(&self) -> &CatalogStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == CatalogStatus::Loading
    }

    /// The latest ticket issued; responses carrying any other are stale.
    pub fn ticket(&self) -> Ticket {
        Ticket {
            form: self.form,
            generation: self.generation,
        }
    }

    /// Start watching `endpoint`. Returns the fetch to run when `fetch` is
    /// set and the endpoint is non-empty.
    pub fn watch(&mut self, config: RawConfig, fetch: bool) -> Option<CatalogRequest> {
        self.generation += 1;
        self.endpoint = config.endpoint.clone();

        if !fetch || config.endpoint.trim().is_empty() {
            self.status = CatalogStatus::Idle;
            return None;
        }

        self.status = CatalogStatus::Loading;
        Some(CatalogRequest {
            ticket: self.ticket(),
            config,
        })
    }

    /// Apply a fetch result. Returns false when the response was stale.
    pub fn apply(&mut self, response: CatalogResponse) -> bool {
        if response.ticket != self.ticket() || response.endpoint != self.endpoint {
            tracing::debug!(
                endpoint = %response.endpoint,
                generation = response.ticket.generation,
                current = self.generation,
                "Dropping stale catalog response"
            );
            return false;
        }

        match response.result {
            Ok(models) => {
                tracing::debug!(endpoint = %self.endpoint, count = models.len(), "Catalog loaded");
                self.cache.insert(response.endpoint, models);
                self.status = CatalogStatus::Loaded;
            }
            Err(reason) => {
                tracing::warn!(endpoint = %self.endpoint, %reason, "Catalog fetch failed");
                self.status = CatalogStatus::Failed(reason);
            }
        }
        true
    }

    /// Make every outstanding request stale without issuing a new one.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        if self.status == CatalogStatus::Loading {
            self.status = CatalogStatus::Idle;
        }
    }

    /// Model ids known for the watched endpoint
    pub fn suggestions(&self) -> &[String] {
        self.cache
            .get(&self.endpoint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the watched endpoint serves `model`, or `None` while the
    /// catalog has not loaded and the picker accepts free text.
    pub fn offers(&self, model: &str) -> Option<bool> {
        if self.status != CatalogStatus::Loaded {
            return None;
        }
        let latest = format!("{}:latest", model);
        Some(
            self.suggestions()
                .iter()
                .any(|id| id == model || *id == latest),
        )
    }
}
