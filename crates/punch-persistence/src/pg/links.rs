//! Vínculos de identidad externa sobre `external_identity_links`.

use chrono::{DateTime, Utc};
use diesel::dsl::sql;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::Timestamptz;
use diesel::upsert::excluded;
use log::debug;
use punch_core::{IdentityLinkStore, IngestContext, LinkRow, StoreError};
use punch_domain::{IdentityLink, LinkStatus, LinkTouch, Provider};
use serde_json::Value;

use super::{run_in_tenant_tx, ConnectionProvider, TxMode};
use crate::error::PersistenceError;
use crate::schema::external_identity_links as links;

/// Inserción inicial; status, seen_count y timestamps toman los DEFAULT.
#[derive(Insertable, Debug)]
#[diesel(table_name = links)]
struct NewLinkRow<'a> {
    tenant_id: &'a str,
    provider: &'a str,
    external_user_id: &'a str,
    last_seen_payload: &'a Value,
}

#[derive(Queryable, Debug)]
struct LinkRecord {
    tenant_id: String,
    provider: String,
    external_user_id: String,
    status: String,
    person_id: Option<String>,
    first_seen_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    seen_count: i64,
    last_seen_payload: Value,
}

impl TryFrom<LinkRecord> for IdentityLink {
    type Error = PersistenceError;

    fn try_from(r: LinkRecord) -> Result<Self, Self::Error> {
        let provider: Provider = r.provider
                                  .parse()
                                  .map_err(|e| PersistenceError::CorruptRow(format!("provider: {e}")))?;
        let status: LinkStatus = r.status
                                  .parse()
                                  .map_err(|e| PersistenceError::CorruptRow(format!("status: {e}")))?;
        Ok(IdentityLink { tenant_id: r.tenant_id,
                          provider,
                          external_user_id: r.external_user_id,
                          status,
                          person_id: r.person_id,
                          first_seen_at: r.first_seen_at,
                          last_seen_at: r.last_seen_at,
                          seen_count: r.seen_count,
                          last_seen_payload: r.last_seen_payload })
    }
}

/// Store Postgres de vínculos de identidad.
pub struct PgIdentityLinkStore<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgIdentityLinkStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Upsert atómico por clave: la fila existente sólo actualiza
    /// last_seen_at, seen_count y el snapshot.
    pub fn upsert(&self, ctx: &IngestContext, touch: &LinkTouch) -> Result<LinkRow, PersistenceError> {
        run_in_tenant_tx(&self.provider, ctx, &touch.tenant_id, TxMode::ReadWrite, |tx| upsert_link(tx, touch))
    }

    /// Lectura del vínculo completo (None si nunca se vio).
    pub fn find_link(&self,
                     ctx: &IngestContext,
                     tenant_id: &str,
                     provider: Provider,
                     external_user_id: &str)
                     -> Result<Option<IdentityLink>, PersistenceError> {
        run_in_tenant_tx(&self.provider, ctx, tenant_id, TxMode::ReadOnly, |tx| {
            let record: Option<LinkRecord> = links::table.filter(links::tenant_id.eq(tenant_id))
                                                         .filter(links::provider.eq(provider.as_str()))
                                                         .filter(links::external_user_id.eq(external_user_id))
                                                         .first(tx)
                                                         .optional()?;
            record.map(IdentityLink::try_from).transpose()
        })
    }

    /// Cambia estado/persona de un vínculo existente. Es la vía administrativa
    /// de vinculación; la ingesta nunca la usa. Devuelve `false` si no existe.
    pub fn set_link_state(&self,
                          ctx: &IngestContext,
                          tenant_id: &str,
                          provider: Provider,
                          external_user_id: &str,
                          status: LinkStatus,
                          person_id: Option<&str>)
                          -> Result<bool, PersistenceError> {
        run_in_tenant_tx(&self.provider, ctx, tenant_id, TxMode::ReadWrite, |tx| {
            let updated = diesel::update(links::table.filter(links::tenant_id.eq(tenant_id))
                                                     .filter(links::provider.eq(provider.as_str()))
                                                     .filter(links::external_user_id.eq(external_user_id)))
                .set((links::status.eq(status.as_str()), links::person_id.eq(person_id)))
                .execute(tx)?;
            Ok(updated == 1)
        })
    }
}

fn upsert_link(tx: &mut PgConnection, touch: &LinkTouch) -> Result<LinkRow, PersistenceError> {
    let row = NewLinkRow { tenant_id: &touch.tenant_id,
                           provider: touch.provider.as_str(),
                           external_user_id: &touch.external_user_id,
                           last_seen_payload: &touch.last_seen_payload };
    let (status, person_id): (String, Option<String>) =
        diesel::insert_into(links::table).values(&row)
                                         .on_conflict((links::tenant_id, links::provider, links::external_user_id))
                                         .do_update()
                                         .set((links::last_seen_at.eq(sql::<Timestamptz>("now()")),
                                               links::seen_count.eq(links::seen_count + 1),
                                               links::last_seen_payload.eq(excluded(links::last_seen_payload))))
                                         .returning((links::status, links::person_id))
                                         .get_result(tx)?;
    debug!("touch_link tenant={} provider={} ext={} status={status}",
           touch.tenant_id,
           touch.provider,
           touch.external_user_id);
    Ok(LinkRow { status, person_id })
}

impl<P: ConnectionProvider> IdentityLinkStore for PgIdentityLinkStore<P> {
    fn touch_link(&self, ctx: &IngestContext, touch: &LinkTouch) -> Result<LinkRow, StoreError> {
        self.upsert(ctx, touch).map_err(StoreError::from)
    }
}
