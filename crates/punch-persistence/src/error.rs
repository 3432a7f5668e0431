//! Errores de persistencia.
//! Mapea errores de Diesel / conexión a variantes semánticas y, hacia el core,
//! a `StoreError`.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use punch_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("not found")]
    NotFound,
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("statement timeout / deadline exceeded")]
    DeadlineExceeded,
    #[error("cancelled")]
    Cancelled,
    #[error("corrupt row: {0}")]
    CorruptRow(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::SerializationFailure => Self::SerializationConflict,
                DatabaseErrorKind::ClosedConnection => Self::TransientIo(info.message().to_string()),
                other => {
                    let msg = info.message();
                    // SET LOCAL statement_timeout llega como error genérico (SQLSTATE 57014).
                    if msg.contains("canceling statement due to statement timeout") {
                        Self::DeadlineExceeded
                    } else {
                        Self::Unknown(format!("db error kind {other:?}: {msg}"))
                    }
                }
            },
            DieselError::DeserializationError(e) => Self::CorruptRow(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::AlreadyInTransaction => Self::Unknown("already in transaction".into()),
            DieselError::RollbackErrorOnCommit { rollback_error, commit_error } => {
                Self::Unknown(format!("rollback={rollback_error}; commit={commit_error}"))
            }
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            DieselError::QueryBuilderError(e) => Self::Unknown(format!("query builder: {e}")),
            DieselError::RollbackTransaction => Self::Unknown("rollback transaction".into()),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl PersistenceError {
    /// Errores para los que reintentar con el mismo request id es seguro.
    pub fn is_retryable(&self) -> bool {
        match self {
            PersistenceError::SerializationConflict
            | PersistenceError::TransientIo(_)
            | PersistenceError::DeadlineExceeded => true,
            // Algunos mensajes llegan como Unknown con texto; best-effort sin SQLSTATE.
            PersistenceError::Unknown(msg) => {
                let m = msg.to_lowercase();
                m.contains("deadlock detected")
                || m.contains("could not serialize access due to concurrent update")
                || m.contains("terminating connection due to administrator command")
                || m.contains("connection closed")
                || m.contains("connection refused")
            }
            _ => false,
        }
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Cancelled => StoreError::Cancelled,
            PersistenceError::DeadlineExceeded => StoreError::DeadlineExceeded,
            PersistenceError::SerializationConflict => StoreError::Conflict("serialization conflict".into()),
            ref e if e.is_retryable() => StoreError::Unavailable(e.to_string()),
            other => StoreError::Other(other.to_string()),
        }
    }
}

impl From<StoreError> for PersistenceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cancelled => PersistenceError::Cancelled,
            StoreError::DeadlineExceeded => PersistenceError::DeadlineExceeded,
            StoreError::Conflict(_) => PersistenceError::SerializationConflict,
            StoreError::Unavailable(msg) => PersistenceError::TransientIo(msg),
            StoreError::Other(msg) => PersistenceError::Unknown(msg),
        }
    }
}
