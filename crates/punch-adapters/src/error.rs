use punch_domain::DomainError;
use thiserror::Error;

/// Errores del camino pull (token + consulta de marcajes).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PullError {
    /// El proveedor rechazó el token; la caché ya fue invalidada.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Normalize(#[from] DomainError),
}
