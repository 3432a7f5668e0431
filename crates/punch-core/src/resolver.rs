//! Resolución de identidad externa.
use log::{debug, error};
use punch_domain::{LinkResolution, LinkStatus, TouchLinkParams};
use serde_json::Value;

use crate::context::IngestContext;
use crate::errors::CoreError;
use crate::store::IdentityLinkStore;

/// Registra cada avistamiento de un usuario externo y devuelve el estado del
/// vínculo posterior a la escritura.
pub struct IdentityResolver<S> {
    store: S,
}

impl<S: IdentityLinkStore> IdentityResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Valida la entrada (antes de cualquier I/O), ejecuta el upsert en una
    /// transacción del store y parsea el estado resultante.
    ///
    /// Un estado almacenado que no pertenece al enum cerrado es un error de
    /// integridad, no un `pending` implícito.
    pub fn touch(&self,
                 ctx: &IngestContext,
                 tenant_id: &str,
                 provider: &str,
                 external_user_id: &str,
                 last_seen_payload: Option<&Value>)
                 -> Result<LinkResolution, CoreError> {
        let touch = TouchLinkParams { tenant_id,
                                      provider,
                                      external_user_id,
                                      last_seen_payload }.validate()?;
        debug!("touch:start tenant={} provider={} external_user_id={}",
               touch.tenant_id, touch.provider, touch.external_user_id);
        let row = self.store.touch_link(ctx, &touch).map_err(|e| {
                                                          error!("touch:store error tenant={} provider={} err={e}",
                                                                 touch.tenant_id, touch.provider);
                                                          e
                                                      })?;
        let status: LinkStatus = row.status
                                    .parse()
                                    .map_err(|_| CoreError::UnrecognizedStatus(row.status.clone()))?;
        let person_id = row.person_id.filter(|p| !p.trim().is_empty());
        debug!("touch:done tenant={} external_user_id={} status={status}",
               touch.tenant_id, touch.external_user_id);
        Ok(LinkResolution { status, person_id })
    }
}
