use crate::core::record::ProjectId;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: project {0}")]
    NotFound(ProjectId),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error(
        "Concurrent modification: sheet changed on disk during the operation (expected {expected}, found {actual})"
    )]
    ConcurrentModification { expected: String, actual: String },
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Caller-facing classification of a [`SheetError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Schema,
    Storage,
    ConcurrentModification,
    Config,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Schema => "schema_error",
            ErrorKind::Storage => "storage_error",
            ErrorKind::ConcurrentModification => "concurrent_modification",
            ErrorKind::Config => "config_error",
        }
    }
}

impl SheetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SheetError::ValidationError(_) => ErrorKind::Validation,
            SheetError::NotFound(_) => ErrorKind::NotFound,
            SheetError::SchemaError(_) => ErrorKind::Schema,
            SheetError::IoError(_) | SheetError::StorageError(_) => ErrorKind::Storage,
            SheetError::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            SheetError::ConfigError(_) => ErrorKind::Config,
        }
    }
}
