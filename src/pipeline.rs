//! Entrega completa: bytes de un proveedor → marcajes normalizados →
//! orquestación marcaje a marcaje.
//!
//! La normalización es todo-o-nada; la orquestación procesa en orden y se
//! detiene en el primer error. Como cada escritura es idempotente, re-entregar
//! el mismo evento tras una falla parcial no duplica nada.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use punch_adapters::{normalizer_for, CheckinPuller, CheckinQuery, PayloadNormalizer, TokenSource};
use punch_core::{IdentityLinkStore, IngestContext, IngestOrchestrator, PunchEventStore};
use punch_domain::{ExternalPunch, IngestResult, Provider};

use crate::config::AppConfig;
use crate::errors::PipelineError;

pub struct IngestPipeline<L, P> {
    orchestrator: IngestOrchestrator<L, P>,
    normalizers: HashMap<Provider, Box<dyn PayloadNormalizer>>,
    initiator_id: String,
    punch_deadline: Option<Duration>,
}

impl<L: IdentityLinkStore, P: PunchEventStore> IngestPipeline<L, P> {
    /// Registra un normalizador por cada proveedor soportado.
    pub fn new(links: L, punches: P, initiator_id: impl Into<String>) -> Self {
        let normalizers = Provider::ALL.iter().map(|p| (*p, normalizer_for(*p))).collect();
        Self { orchestrator: IngestOrchestrator::new(links, punches),
               normalizers,
               initiator_id: initiator_id.into(),
               punch_deadline: None }
    }

    pub fn from_config(links: L, punches: P, config: &AppConfig) -> Self {
        Self::new(links, punches, config.initiator_id.clone()).with_punch_deadline(config.punch_deadline)
    }

    pub fn with_punch_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.punch_deadline = deadline;
        self
    }

    pub fn orchestrator(&self) -> &IngestOrchestrator<L, P> {
        &self.orchestrator
    }

    pub fn initiator_id(&self) -> &str {
        &self.initiator_id
    }

    /// Normaliza e ingesta una entrega webhook.
    pub fn ingest_delivery(&self,
                           ctx: &IngestContext,
                           tenant_id: &str,
                           provider: &str,
                           event_id: &str,
                           corp_id: &str,
                           payload: &[u8])
                           -> Result<Vec<IngestResult>, PipelineError> {
        let provider: Provider = provider.parse()?;
        let normalizer = match self.normalizers.get(&provider) {
            Some(n) => n,
            None => return Err(punch_domain::DomainError::UnknownProvider(provider.to_string()).into()),
        };
        let punches = normalizer.normalize(event_id, corp_id, payload)?;
        debug!("delivery:normalized provider={provider} event_id={event_id} punches={}", punches.len());
        self.ingest_punches(ctx, tenant_id, &punches)
    }

    /// Obtiene marcajes vía pull (WeCom) y los ingesta por el mismo camino.
    ///
    /// Sólo la obtención es asíncrona: la orquestación corre sincrónicamente en
    /// el hilo que hace el poll. Con stores bloqueantes (Postgres/Diesel) el
    /// llamador debe invocarlo desde un hilo que tolere bloqueo, p.ej. dentro de
    /// `tokio::task::spawn_blocking` con un `Handle::block_on`, o bajo
    /// `tokio::task::block_in_place` en un runtime multi-hilo.
    pub async fn ingest_pull<T: TokenSource, Q: CheckinQuery>(&self,
                                                              ctx: &IngestContext,
                                                              tenant_id: &str,
                                                              puller: &CheckinPuller<T, Q>,
                                                              corp_id: &str,
                                                              start: DateTime<Utc>,
                                                              end: DateTime<Utc>,
                                                              user_ids: &[String])
                                                              -> Result<Vec<IngestResult>, PipelineError> {
        let punches = puller.pull(corp_id, start, end, user_ids).await?;
        debug!("pull:normalized corp_id={corp_id} punches={}", punches.len());
        self.ingest_punches(ctx, tenant_id, &punches)
    }

    /// Orquesta en orden; se detiene en el primer error.
    pub fn ingest_punches(&self,
                          ctx: &IngestContext,
                          tenant_id: &str,
                          punches: &[ExternalPunch])
                          -> Result<Vec<IngestResult>, PipelineError> {
        let mut completed = Vec::with_capacity(punches.len());
        for (index, punch) in punches.iter().enumerate() {
            let punch_ctx = self.punch_context(ctx);
            match self.orchestrator.ingest(&punch_ctx, tenant_id, &self.initiator_id, punch) {
                Ok(result) => completed.push(result),
                Err(source) => {
                    warn!("delivery:stopped tenant={tenant_id} index={index} request_id={} err={source}",
                          punch.request_id);
                    return Err(PipelineError::Ingest { index,
                                                       request_id: punch.request_id.clone(),
                                                       source,
                                                       completed });
                }
            }
        }
        Ok(completed)
    }

    /// El deadline por marcaje sólo acota el del llamador, nunca lo extiende.
    fn punch_context(&self, ctx: &IngestContext) -> IngestContext {
        let Some(timeout) = self.punch_deadline else {
            return ctx.clone();
        };
        let candidate = Instant::now() + timeout;
        match ctx.deadline() {
            Some(parent) if parent <= candidate => ctx.clone(),
            _ => ctx.clone().with_deadline(candidate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use punch_core::{InMemoryLinkStore, InMemoryPunchStore};

    fn pipeline(deadline: Option<Duration>) -> IngestPipeline<InMemoryLinkStore, InMemoryPunchStore> {
        IngestPipeline::new(InMemoryLinkStore::new(), InMemoryPunchStore::new(), "test").with_punch_deadline(deadline)
    }

    #[test]
    fn punch_deadline_never_widens_caller_deadline() {
        let p = pipeline(Some(Duration::from_secs(60)));
        let tight = IngestContext::background().with_timeout(Duration::from_millis(50));
        assert_eq!(p.punch_context(&tight).deadline(), tight.deadline());

        let open = IngestContext::background();
        assert!(p.punch_context(&open).deadline().is_some());
    }

    #[test]
    fn from_config_carries_initiator_and_deadline() {
        let cfg = AppConfig { initiator_id: "ops-batch".into(),
                              punch_deadline: Some(Duration::from_secs(5)),
                              database: None };
        let p = IngestPipeline::from_config(InMemoryLinkStore::new(), InMemoryPunchStore::new(), &cfg);
        assert_eq!(p.initiator_id(), "ops-batch");
        assert!(p.punch_context(&IngestContext::background()).deadline().is_some());
    }

    #[test]
    fn no_punch_deadline_keeps_context() {
        let p = pipeline(None);
        assert!(p.punch_context(&IngestContext::background()).deadline().is_none());
    }
}
