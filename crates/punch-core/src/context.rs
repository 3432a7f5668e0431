//! Contexto de invocación: deadline opcional y token de cancelación.
//!
//! El contexto viaja desde el llamador hasta el store. Los stores llaman a
//! `check()` antes de confirmar la transacción; si el contexto expiró o fue
//! cancelado, la transacción se revierte y no queda estado parcial.
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::store::StoreError;

#[derive(Debug, Clone, Default)]
pub struct IngestContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl IngestContext {
    /// Contexto sin deadline ni cancelación previa.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Tiempo restante hasta el deadline (`Some(ZERO)` si ya expiró).
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn check(&self) -> Result<(), StoreError> {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Err(StoreError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
