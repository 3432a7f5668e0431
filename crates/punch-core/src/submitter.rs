//! Escritura idempotente de eventos de marcaje.
use log::{debug, error};
use punch_domain::{ExternalPunch, SubmitPunchParams};
use uuid::Uuid;

use crate::context::IngestContext;
use crate::errors::CoreError;
use crate::store::PunchEventStore;

pub struct PunchSubmitter<S> {
    store: S,
}

impl<S: PunchEventStore> PunchSubmitter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registra `punch` para `person_id`. Reenvíos con el mismo request id
    /// devuelven el id del evento original; la garantía la da el store.
    pub fn submit(&self,
                  ctx: &IngestContext,
                  tenant_id: &str,
                  person_id: &str,
                  punch: &ExternalPunch,
                  initiator_id: &str)
                  -> Result<Uuid, CoreError> {
        self.submit_params(ctx,
                           &SubmitPunchParams { tenant_id,
                                                person_id,
                                                initiator_id,
                                                provider: punch.provider.as_str(),
                                                punch_type: punch.punch_type.as_str(),
                                                punched_at: punch.punched_at,
                                                request_id: &punch.request_id,
                                                payload: Some(&punch.payload),
                                                raw_payload: Some(&punch.raw_payload),
                                                device_info: Some(&punch.device_info) })
    }

    /// Variante para llamadores que ya traen los parámetros crudos.
    pub fn submit_params(&self, ctx: &IngestContext, params: &SubmitPunchParams<'_>) -> Result<Uuid, CoreError> {
        let submission = params.validate()?;
        debug!("submit:start tenant={} provider={} request_id={}",
               submission.tenant_id, submission.provider, submission.request_id);
        let event_id = self.store.submit_punch(ctx, &submission).map_err(|e| {
                                                                      error!("submit:store error request_id={} err={e}",
                                                                             submission.request_id);
                                                                      e
                                                                  })?;
        debug!("submit:done request_id={} event_id={event_id}", submission.request_id);
        Ok(event_id)
    }
}
