//! Error taxonomy for store, import and export operations.
//!
//! Validation failures stay inside the validator as
//! [`ValidationResult`](crate::i18n::ValidationResult) values; they only
//! become [`StoreError::Validation`] when a mutation is refused.

use crate::interchange::ParseError;
use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Input rejected by the key or field validators
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniquely named thing already exists
    #[error("{0}")]
    Conflict(String),

    #[error("cannot remove language '{0}': a project must keep at least one language")]
    LastLanguage(String),

    #[error("none of the languages {0:?} is an active supported language")]
    NoSupportedLanguages(Vec<String>),

    #[error("invalid import payload: {0}")]
    Parse(#[from] ParseError),

    #[error("import session is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("stored record could not be decoded: {0}")]
    CorruptRecord(#[from] serde_json::Error),

    #[error("file access failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure came from a collaborator rather than the input.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            StoreError::Storage(_) | StoreError::Io { .. } | StoreError::CorruptRecord(_)
        )
    }
}
