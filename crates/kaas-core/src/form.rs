//! Model configuration form
//!
//! [`ModelForm`] owns the field state of one model configuration while it is
//! being created or edited. It never performs I/O: catalog fetches are handed
//! to the owner as [`CatalogRequest`]s and their results come back through
//! [`ModelForm::apply_catalog`].

use std::fmt;

use uuid::Uuid;

use crate::catalog::{CatalogRequest, CatalogResponse, ModelCatalog};
use crate::error::{KaasError, Result};
use crate::schema::{FieldError, FieldErrors, Submission, ValidationSchema};
use crate::{ModelConfig, Provider, RawConfig};

/// Form fields in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Alias,
    Endpoint,
    Model,
    Provider,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Carried and submitted but not user-editable
    Hidden,
    ModelPicker,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Alias,
        Field::Endpoint,
        Field::Model,
        Field::Provider,
        Field::Id,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Alias => "alias",
            Field::Endpoint => "endpoint",
            Field::Model => "model",
            Field::Provider => "provider",
            Field::Id => "id",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Alias | Field::Endpoint => FieldKind::Text,
            Field::Model => FieldKind::ModelPicker,
            Field::Provider | Field::Id => FieldKind::Hidden,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Raw field state. Strings are never absent so inputs stay controlled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub provider: String,
    pub alias: String,
    pub endpoint: String,
    pub model: String,
    pub id: Option<String>,
}

impl FormValues {
    pub fn defaults(provider: Provider) -> Self {
        Self {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Alias => &self.alias,
            Field::Endpoint => &self.endpoint,
            Field::Model => &self.model,
            Field::Provider => &self.provider,
            Field::Id => self.id.as_deref().unwrap_or(""),
        }
    }

    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Alias => self.alias = value,
            Field::Endpoint => self.endpoint = value,
            Field::Model => self.model = value,
            Field::Provider => self.provider = value,
            Field::Id => self.id = Some(value),
        }
    }
}

impl From<&ModelConfig> for FormValues {
    fn from(model: &ModelConfig) -> Self {
        Self {
            provider: model.provider.to_string(),
            alias: model.alias.clone(),
            endpoint: model.endpoint.clone(),
            model: model.model.clone(),
            id: Some(model.id.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    New,
    Edit(ModelConfig),
}

#[derive(Debug)]
pub struct ModelForm {
    mode: FormMode,
    schema: ValidationSchema,
    initial: FormValues,
    values: FormValues,
    errors: FieldErrors,
    catalog: ModelCatalog,
    load_models_on_init: bool,
}

impl ModelForm {
    pub fn new(mode: FormMode) -> Self {
        let (initial, load_models_on_init) = match &mode {
            FormMode::New => (FormValues::defaults(Provider::Ollama), false),
            FormMode::Edit(model) => (FormValues::from(model), true),
        };

        Self {
            schema: ValidationSchema::for_mode(&mode),
            mode,
            values: initial.clone(),
            initial,
            errors: FieldErrors::default(),
            catalog: ModelCatalog::new(Uuid::new_v4()),
            load_models_on_init,
        }
    }

    /// Start watching the initial endpoint; edit forms fetch right away.
    pub fn mount(&mut self) -> Option<CatalogRequest> {
        let config = self.raw_config();
        self.catalog.watch(config, self.load_models_on_init)
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn value(&self, field: Field) -> &str {
        self.values.get(field)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: Field) -> Option<&FieldError> {
        self.errors.get(field)
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn is_dirty(&self) -> bool {
        self.values != self.initial
    }

    /// Fields to render, in order. `id` only exists while editing.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL
            .into_iter()
            .filter(move |field| *field != Field::Id || self.is_edit())
    }

    /// Update a user-editable field. Changing the endpoint re-watches the
    /// catalog and may return a fetch to run.
    pub fn set_field(
        &mut self,
        field: Field,
        value: impl Into<String>,
    ) -> Result<Option<CatalogRequest>> {
        if field.kind() == FieldKind::Hidden {
            return Err(KaasError::ReadOnlyField(field));
        }

        let value = value.into();
        self.errors.remove(field);

        if field != Field::Endpoint {
            self.values.set(field, value);
            return Ok(None);
        }
        if self.values.endpoint == value {
            return Ok(None);
        }

        self.values.endpoint = value;
        // New forms never fetch against the default (empty) endpoint.
        let fetch = self.load_models_on_init || self.values.endpoint != self.initial.endpoint;
        let config = self.raw_config();
        Ok(self.catalog.watch(config, fetch))
    }

    pub fn select_model(&mut self, model: impl Into<String>) {
        self.errors.remove(Field::Model);
        self.values.model = model.into();
    }

    /// Restore construction values. Never submits or fetches; outstanding
    /// fetches become stale.
    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.errors.clear();

        if self.catalog.endpoint() == self.initial.endpoint.trim() {
            self.catalog.invalidate();
        } else {
            let config = self.raw_config();
            self.catalog.watch(config, false);
        }
    }

    pub fn apply_catalog(&mut self, response: CatalogResponse) -> bool {
        self.catalog.apply(response)
    }

    /// Validate the current values. On failure the errors are kept for
    /// display and returned; nothing is emitted.
    pub fn submit(&mut self) -> std::result::Result<Submission, &FieldErrors> {
        let result = self
            .schema
            .validate(&self.values)
            .and_then(|submission| self.check_catalog(submission));

        match result {
            Ok(submission) => {
                self.errors.clear();
                Ok(submission)
            }
            Err(errors) => {
                tracing::debug!(count = errors.len(), "Model form rejected");
                self.errors = errors;
                Err(&self.errors)
            }
        }
    }

    fn check_catalog(
        &self,
        submission: Submission,
    ) -> std::result::Result<Submission, FieldErrors> {
        if self.catalog.endpoint() != self.values.endpoint.trim() {
            return Ok(submission);
        }
        if self.catalog.offers(submission.model()) != Some(false) {
            return Ok(submission);
        }

        let mut errors = FieldErrors::default();
        errors.insert(
            Field::Model,
            FieldError::NotInCatalog(submission.model().to_string()),
        );
        Err(errors)
    }

    fn raw_config(&self) -> RawConfig {
        let provider = self.values.provider.parse().unwrap_or_default();
        RawConfig::new(provider, self.values.endpoint.trim())
    }
}
