use thiserror::Error;

use crate::form::Field;

#[derive(Error, Debug)]
pub enum KaasError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Field is not editable: {0}")]
    ReadOnlyField(Field),

    #[error("Dialog is not open")]
    DialogClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, KaasError>;
