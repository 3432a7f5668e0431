//! Eventos de marcaje sobre `punch_events`.

use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use log::debug;
use punch_core::{IngestContext, PunchEventStore, StoreError};
use punch_domain::{Provider, PunchEvent, PunchSubmission, PunchType};
use serde_json::Value;
use uuid::Uuid;

use super::{run_in_tenant_tx, ConnectionProvider, TxMode};
use crate::error::PersistenceError;
use crate::schema::punch_events as punches;

/// Fila para insertar en `punch_events`; `id` y `created_at` los asigna la DB.
#[derive(Insertable, Debug)]
#[diesel(table_name = punches)]
struct NewPunchRow<'a> {
    tenant_id: &'a str,
    person_id: &'a str,
    provider: &'a str,
    request_id: &'a str,
    punch_type: &'a str,
    punched_at: DateTime<Utc>,
    payload: &'a Value,
    raw_payload: &'a Value,
    device_info: &'a Value,
    initiator_id: &'a str,
}

#[derive(Queryable, Debug)]
struct PunchRecord {
    id: Uuid,
    tenant_id: String,
    person_id: String,
    provider: String,
    request_id: String,
    punch_type: String,
    punched_at: DateTime<Utc>,
    payload: Value,
    raw_payload: Value,
    device_info: Value,
    initiator_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PunchRecord> for PunchEvent {
    type Error = PersistenceError;

    fn try_from(r: PunchRecord) -> Result<Self, Self::Error> {
        let provider: Provider = r.provider
                                  .parse()
                                  .map_err(|e| PersistenceError::CorruptRow(format!("provider: {e}")))?;
        let punch_type: PunchType = r.punch_type
                                     .parse()
                                     .map_err(|e| PersistenceError::CorruptRow(format!("punch_type: {e}")))?;
        Ok(PunchEvent { event_id: r.id,
                        tenant_id: r.tenant_id,
                        person_id: r.person_id,
                        provider,
                        punch_type,
                        punched_at: r.punched_at,
                        request_id: r.request_id,
                        payload: r.payload,
                        raw_payload: r.raw_payload,
                        device_info: r.device_info,
                        initiator_id: r.initiator_id,
                        created_at: r.created_at })
    }
}

/// Store Postgres de eventos de marcaje (append-only, idempotente).
pub struct PgPunchEventStore<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgPunchEventStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// `INSERT .. ON CONFLICT DO NOTHING RETURNING id`; si no hubo inserción
    /// se lee el id existente dentro de la misma transacción.
    pub fn insert(&self, ctx: &IngestContext, punch: &PunchSubmission) -> Result<Uuid, PersistenceError> {
        run_in_tenant_tx(&self.provider, ctx, &punch.tenant_id, TxMode::ReadWrite, |tx| insert_punch(tx, punch))
    }

    pub fn find_event(&self,
                      ctx: &IngestContext,
                      tenant_id: &str,
                      provider: Provider,
                      request_id: &str)
                      -> Result<Option<PunchEvent>, PersistenceError> {
        run_in_tenant_tx(&self.provider, ctx, tenant_id, TxMode::ReadOnly, |tx| {
            let record: Option<PunchRecord> = punches::table.filter(punches::tenant_id.eq(tenant_id))
                                                            .filter(punches::provider.eq(provider.as_str()))
                                                            .filter(punches::request_id.eq(request_id))
                                                            .first(tx)
                                                            .optional()?;
            record.map(PunchEvent::try_from).transpose()
        })
    }

    /// Cantidad de eventos para una clave de idempotencia (0 o 1).
    pub fn count_for_request(&self,
                             ctx: &IngestContext,
                             tenant_id: &str,
                             provider: Provider,
                             request_id: &str)
                             -> Result<i64, PersistenceError> {
        run_in_tenant_tx(&self.provider, ctx, tenant_id, TxMode::ReadOnly, |tx| {
            let n = punches::table.filter(punches::tenant_id.eq(tenant_id))
                                  .filter(punches::provider.eq(provider.as_str()))
                                  .filter(punches::request_id.eq(request_id))
                                  .count()
                                  .get_result(tx)?;
            Ok(n)
        })
    }
}

fn insert_punch(tx: &mut PgConnection, punch: &PunchSubmission) -> Result<Uuid, PersistenceError> {
    let row = NewPunchRow { tenant_id: &punch.tenant_id,
                            person_id: &punch.person_id,
                            provider: punch.provider.as_str(),
                            request_id: &punch.request_id,
                            punch_type: punch.punch_type.as_str(),
                            punched_at: punch.punched_at,
                            payload: &punch.payload,
                            raw_payload: &punch.raw_payload,
                            device_info: &punch.device_info,
                            initiator_id: &punch.initiator_id };
    let inserted: Option<Uuid> = diesel::insert_into(punches::table).values(&row)
                                                                    .on_conflict((punches::tenant_id,
                                                                                  punches::provider,
                                                                                  punches::request_id))
                                                                    .do_nothing()
                                                                    .returning(punches::id)
                                                                    .get_result(tx)
                                                                    .optional()?;
    match inserted {
        Some(id) => {
            debug!("submit_punch:new tenant={} request_id={} id={id}", punch.tenant_id, punch.request_id);
            Ok(id)
        }
        None => {
            let id = punches::table.filter(punches::tenant_id.eq(&punch.tenant_id))
                                   .filter(punches::provider.eq(punch.provider.as_str()))
                                   .filter(punches::request_id.eq(&punch.request_id))
                                   .select(punches::id)
                                   .first(tx)?;
            debug!("submit_punch:dup tenant={} request_id={} id={id}", punch.tenant_id, punch.request_id);
            Ok(id)
        }
    }
}

impl<P: ConnectionProvider> PunchEventStore for PgPunchEventStore<P> {
    fn submit_punch(&self, ctx: &IngestContext, punch: &PunchSubmission) -> Result<Uuid, StoreError> {
        self.insert(ctx, punch).map_err(StoreError::from)
    }
}
