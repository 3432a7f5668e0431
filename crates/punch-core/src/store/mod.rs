//! Capacidades de almacenamiento y backend en memoria.

mod memory;

pub use memory::{InMemoryLinkStore, InMemoryPunchStore};

use punch_domain::{LinkTouch, PunchSubmission};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::context::IngestContext;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("write conflict (retryable): {0}")]
    Conflict(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("cancelled")]
    Cancelled,
    #[error("storage error: {0}")]
    Other(String),
}

impl StoreError {
    /// Reintentar con el mismo request id es seguro para estas variantes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Conflict(_) | StoreError::DeadlineExceeded)
    }
}

/// Fila devuelta por `touch_link`. `status` llega sin parsear: el resolver es
/// quien decide si es un estado reconocido.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRow {
    pub status: String,
    pub person_id: Option<String>,
}

/// Vínculos de identidad externa.
pub trait IdentityLinkStore: Send + Sync {
    /// Inserta el vínculo (`pending`, seen_count=1) o, si ya existe, actualiza
    /// last_seen_at, incrementa seen_count y reemplaza el snapshot, sin tocar
    /// status ni persona. Atómico por clave; devuelve el estado posterior.
    fn touch_link(&self, ctx: &IngestContext, touch: &LinkTouch) -> Result<LinkRow, StoreError>;
}

/// Eventos de marcaje.
pub trait PunchEventStore: Send + Sync {
    /// Inserción idempotente por (tenant, provider, request_id). Devuelve el id
    /// del evento nuevo o del ya existente.
    fn submit_punch(&self, ctx: &IngestContext, punch: &PunchSubmission) -> Result<Uuid, StoreError>;
}

impl<T: IdentityLinkStore + ?Sized> IdentityLinkStore for Arc<T> {
    fn touch_link(&self, ctx: &IngestContext, touch: &LinkTouch) -> Result<LinkRow, StoreError> {
        (**self).touch_link(ctx, touch)
    }
}

impl<T: PunchEventStore + ?Sized> PunchEventStore for Arc<T> {
    fn submit_punch(&self, ctx: &IngestContext, punch: &PunchSubmission) -> Result<Uuid, StoreError> {
        (**self).submit_punch(ctx, punch)
    }
}
