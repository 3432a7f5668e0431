//! Orquestador de ingesta: una decisión por marcaje.
//!
//! Tabla de transiciones (estado observado tras el `touch`):
//! - `Active` con persona -> submit -> `Ingested`.
//! - `Active` sin persona -> error de integridad.
//! - `Pending` -> `Unmapped`; `Ignored` -> `Ignored`; `Disabled` -> `Disabled`.
//!
//! El avistamiento se registra siempre, antes de decidir: el bookkeeping del
//! vínculo no depende de que el usuario esté mapeado.
use log::{debug, warn};
use punch_domain::{ExternalPunch, IngestOutcome, IngestResult, LinkStatus};

use crate::context::IngestContext;
use crate::errors::CoreError;
use crate::resolver::IdentityResolver;
use crate::store::{IdentityLinkStore, PunchEventStore};
use crate::submitter::PunchSubmitter;

pub struct IngestOrchestrator<L, P> {
    resolver: IdentityResolver<L>,
    submitter: PunchSubmitter<P>,
}

impl<L: IdentityLinkStore, P: PunchEventStore> IngestOrchestrator<L, P> {
    pub fn new(links: L, punches: P) -> Self {
        Self { resolver: IdentityResolver::new(links),
               submitter: PunchSubmitter::new(punches) }
    }

    pub fn resolver(&self) -> &IdentityResolver<L> {
        &self.resolver
    }

    pub fn submitter(&self) -> &PunchSubmitter<P> {
        &self.submitter
    }

    pub fn ingest(&self,
                  ctx: &IngestContext,
                  tenant_id: &str,
                  initiator_id: &str,
                  punch: &ExternalPunch)
                  -> Result<IngestResult, CoreError> {
        let resolution = self.resolver.touch(ctx,
                                             tenant_id,
                                             punch.provider.as_str(),
                                             &punch.external_user_id,
                                             Some(&punch.last_seen_payload))?;
        let skipped = |outcome: IngestOutcome| {
            debug!("ingest:{outcome} tenant={tenant_id} external_user_id={} request_id={}",
                   punch.external_user_id, punch.request_id);
            IngestResult { outcome,
                           status: resolution.status,
                           person_id: resolution.person_id.clone(),
                           event_id: None }
        };
        match resolution.status {
            LinkStatus::Pending => Ok(skipped(IngestOutcome::Unmapped)),
            LinkStatus::Ignored => Ok(skipped(IngestOutcome::Ignored)),
            LinkStatus::Disabled => Ok(skipped(IngestOutcome::Disabled)),
            LinkStatus::Active => {
                let Some(person_id) = resolution.person_id.as_deref() else {
                    warn!("ingest:integrity active link without person tenant={tenant_id} provider={} external_user_id={}",
                          punch.provider, punch.external_user_id);
                    return Err(CoreError::ActiveWithoutPerson { tenant_id: tenant_id.trim().to_string(),
                                                                provider: punch.provider,
                                                                external_user_id: punch.external_user_id.clone() });
                };
                let event_id = self.submitter.submit(ctx, tenant_id, person_id, punch, initiator_id)?;
                debug!("ingest:ingested tenant={tenant_id} person_id={person_id} event_id={event_id}");
                Ok(IngestResult { outcome: IngestOutcome::Ingested,
                                  status: LinkStatus::Active,
                                  person_id: Some(person_id.to_string()),
                                  event_id: Some(event_id) })
            }
        }
    }
}
