// error.rs
use thiserror::Error;

/// Error del dominio de ingesta de marcajes.
///
/// Todas las variantes son errores de entrada: no se reintentan sin corregir
/// el payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("invalid json for {field}: {reason}")]
    InvalidJson { field: &'static str, reason: String },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::ValidationError(msg.into())
    }
}
