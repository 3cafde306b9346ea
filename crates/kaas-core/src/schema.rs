//! Per-provider validation rules for model form payloads

use std::collections::BTreeMap;

use thiserror::Error;

use crate::form::{Field, FormMode, FormValues};
use crate::{ModelConfig, NewModelConfig, Provider};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("This field is required")]
    Required,

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Model id cannot be changed")]
    Immutable,

    #[error("Model {0} is not available at this endpoint")]
    NotInCatalog(String),
}

/// Field errors keyed by field, in display order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, FieldError>);

impl FieldErrors {
    pub fn get(&self, field: Field) -> Option<&FieldError> {
        self.0.get(&field)
    }

    pub fn insert(&mut self, field: Field, error: FieldError) {
        self.0.insert(field, error);
    }

    pub fn remove(&mut self, field: Field) -> Option<FieldError> {
        self.0.remove(&field)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldError)> {
        self.0.iter().map(|(field, error)| (*field, error))
    }
}

/// A payload that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    New(NewModelConfig),
    Edit(ModelConfig),
}

impl Submission {
    pub fn endpoint(&self) -> &str {
        match self {
            Submission::New(config) => &config.endpoint,
            Submission::Edit(config) => &config.endpoint,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Submission::New(config) => &config.model,
            Submission::Edit(config) => &config.model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationSchema {
    NewOllama,
    /// Edit payloads must carry the id the form was opened with.
    EditOllama { id: String },
}

impl ValidationSchema {
    pub fn for_mode(mode: &FormMode) -> Self {
        match mode {
            FormMode::New => ValidationSchema::NewOllama,
            FormMode::Edit(model) => ValidationSchema::EditOllama {
                id: model.id.clone(),
            },
        }
    }

    /// Validate every field and report all failures at once.
    pub fn validate(&self, values: &FormValues) -> Result<Submission, FieldErrors> {
        let mut errors = FieldErrors::default();

        let provider = match values.provider.parse::<Provider>() {
            Ok(provider) => Some(provider),
            Err(_) => {
                errors.insert(
                    Field::Provider,
                    FieldError::UnsupportedProvider(values.provider.clone()),
                );
                None
            }
        };
        let alias = required(&mut errors, Field::Alias, &values.alias);
        let endpoint = required(&mut errors, Field::Endpoint, &values.endpoint);
        let model = required(&mut errors, Field::Model, &values.model);
        let id = match self {
            ValidationSchema::NewOllama => None,
            ValidationSchema::EditOllama { id } => {
                check_id(&mut errors, id, values.id.as_deref())
            }
        };

        let (Some(provider), Some(alias), Some(endpoint), Some(model)) =
            (provider, alias, endpoint, model)
        else {
            return Err(errors);
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        let config = NewModelConfig {
            provider,
            alias,
            endpoint,
            model,
        };
        match (self, id) {
            (ValidationSchema::NewOllama, _) => Ok(Submission::New(config)),
            (ValidationSchema::EditOllama { .. }, Some(id)) => {
                Ok(Submission::Edit(config.with_id(id)))
            }
            (ValidationSchema::EditOllama { .. }, None) => Err(errors),
        }
    }
}

fn required(errors: &mut FieldErrors, field: Field, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        errors.insert(field, FieldError::Required);
        return None;
    }
    Some(value.to_string())
}

fn check_id(errors: &mut FieldErrors, expected: &str, value: Option<&str>) -> Option<String> {
    let Some(id) = value.map(str::trim).filter(|id| !id.is_empty()) else {
        errors.insert(Field::Id, FieldError::Required);
        return None;
    };
    if id != expected {
        errors.insert(Field::Id, FieldError::Immutable);
        return None;
    }
    Some(id.to_string())
}
