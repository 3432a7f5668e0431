//! Errores del core y su clasificación.
//!
//! Taxonomía:
//! - Validación (`Validation`): entrada mal formada; no reintentar sin
//!   corregirla.
//! - Integridad (`ActiveWithoutPerson`, `UnrecognizedStatus`): violación de
//!   un invariante aguas arriba; fatal para ese registro, requiere operador.
//! - Almacenamiento (`Storage`): el llamador puede reintentar con el mismo
//!   request id si `classify_error` devuelve `Retryable`.

use punch_domain::{DomainError, Provider};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("active identity link has no person: tenant={tenant_id} provider={provider} external_user_id={external_user_id}")]
    ActiveWithoutPerson {
        tenant_id: String,
        provider: Provider,
        external_user_id: String,
    },
    #[error("unrecognized identity link status: {0}")]
    UnrecognizedStatus(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Integrity,
    Retryable,
    Permanent,
}

pub fn classify_error(err: &CoreError) -> ErrorClass {
    match err {
        CoreError::Validation(_) => ErrorClass::Validation,
        CoreError::ActiveWithoutPerson { .. } | CoreError::UnrecognizedStatus(_) => ErrorClass::Integrity,
        CoreError::Storage(e) if e.is_retryable() => ErrorClass::Retryable,
        CoreError::Storage(_) => ErrorClass::Permanent,
    }
}
