use punch_adapters::PullError;
use punch_core::{classify_error, CoreError, ErrorClass};
use punch_domain::{DomainError, IngestResult};
use thiserror::Error;

/// Falla de una entrega. `Ingest` conserva los resultados previos al error
/// para que el llamador pueda reportarlos; la re-entrega es segura.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Normalización fallida: {0}")]
    Normalize(#[from] DomainError),
    #[error("Pull fallido: {0}")]
    Pull(#[from] PullError),
    #[error("Marcaje #{index} ({request_id}) fallido: {source}")]
    Ingest {
        index: usize,
        request_id: String,
        #[source]
        source: CoreError,
        completed: Vec<IngestResult>,
    },
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Normalize(_) => ErrorClass::Validation,
            PipelineError::Pull(PullError::Normalize(_)) => ErrorClass::Validation,
            PipelineError::Pull(PullError::InvalidResponse(_)) => ErrorClass::Permanent,
            PipelineError::Pull(_) => ErrorClass::Retryable,
            PipelineError::Ingest { source, .. } => classify_error(source),
        }
    }

    /// Resultados completados antes de la falla (vacío si no se llegó a orquestar).
    pub fn completed(&self) -> &[IngestResult] {
        match self {
            PipelineError::Ingest { completed, .. } => completed,
            _ => &[],
        }
    }
}
