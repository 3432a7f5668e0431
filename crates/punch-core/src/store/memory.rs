//! Backend en memoria de los stores, con la misma semántica que Postgres.
//!
//! La atomicidad por clave la da la API `entry` de `DashMap`: la shard de la
//! clave queda bloqueada mientras dura el upsert, así que dos avistamientos
//! concurrentes del mismo usuario no pierden incrementos ni duplican filas.
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;
use punch_domain::{IdentityLink, LinkStatus, LinkTouch, Provider, PunchEvent, PunchSubmission};
use uuid::Uuid;

use super::{IdentityLinkStore, LinkRow, PunchEventStore, StoreError};
use crate::clock::{Clock, SystemClock};
use crate::context::IngestContext;

type Key = (String, Provider, String);

pub struct InMemoryLinkStore<C: Clock = SystemClock> {
    links: DashMap<Key, IdentityLink>,
    clock: C,
}

impl Default for InMemoryLinkStore<SystemClock> {
    fn default() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl InMemoryLinkStore<SystemClock> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock> InMemoryLinkStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { links: DashMap::new(),
               clock }
    }

    pub fn get(&self, tenant_id: &str, provider: Provider, external_user_id: &str) -> Option<IdentityLink> {
        self.links
            .get(&(tenant_id.to_string(), provider, external_user_id.to_string()))
            .map(|l| l.value().clone())
    }

    /// Transición administrativa (fuera del pipeline): fija estado y persona.
    /// Devuelve `false` si el vínculo no existe.
    pub fn set_link_state(&self,
                          tenant_id: &str,
                          provider: Provider,
                          external_user_id: &str,
                          status: LinkStatus,
                          person_id: Option<String>)
                          -> bool {
        match self.links.get_mut(&(tenant_id.to_string(), provider, external_user_id.to_string())) {
            Some(mut link) => {
                link.status = status;
                link.person_id = person_id;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl<C: Clock> IdentityLinkStore for InMemoryLinkStore<C> {
    fn touch_link(&self, ctx: &IngestContext, touch: &LinkTouch) -> Result<LinkRow, StoreError> {
        ctx.check()?;
        let now = self.clock.now();
        let key = (touch.tenant_id.clone(), touch.provider, touch.external_user_id.clone());
        let row = match self.links.entry(key) {
            Entry::Occupied(mut entry) => {
                let link = entry.get_mut();
                link.last_seen_at = now;
                link.seen_count += 1;
                link.last_seen_payload = touch.last_seen_payload.clone();
                LinkRow { status: link.status.as_str().to_string(),
                          person_id: link.person_id.clone() }
            }
            Entry::Vacant(entry) => {
                entry.insert(IdentityLink { tenant_id: touch.tenant_id.clone(),
                                            provider: touch.provider,
                                            external_user_id: touch.external_user_id.clone(),
                                            status: LinkStatus::Pending,
                                            person_id: None,
                                            first_seen_at: now,
                                            last_seen_at: now,
                                            seen_count: 1,
                                            last_seen_payload: touch.last_seen_payload.clone() });
                LinkRow { status: LinkStatus::Pending.as_str().to_string(),
                          person_id: None }
            }
        };
        debug!("touch_link:done tenant={} provider={} external_user_id={} status={}",
               touch.tenant_id, touch.provider, touch.external_user_id, row.status);
        Ok(row)
    }
}

pub struct InMemoryPunchStore<C: Clock = SystemClock> {
    events: DashMap<Key, PunchEvent>,
    clock: C,
}

impl Default for InMemoryPunchStore<SystemClock> {
    fn default() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl InMemoryPunchStore<SystemClock> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock> InMemoryPunchStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { events: DashMap::new(),
               clock }
    }

    pub fn get(&self, tenant_id: &str, provider: Provider, request_id: &str) -> Option<PunchEvent> {
        self.events
            .get(&(tenant_id.to_string(), provider, request_id.to_string()))
            .map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn materialize(&self, punch: &PunchSubmission, created_at: DateTime<Utc>) -> PunchEvent {
        PunchEvent { event_id: Uuid::new_v4(),
                     tenant_id: punch.tenant_id.clone(),
                     person_id: punch.person_id.clone(),
                     provider: punch.provider,
                     punch_type: punch.punch_type,
                     punched_at: punch.punched_at,
                     request_id: punch.request_id.clone(),
                     payload: punch.payload.clone(),
                     raw_payload: punch.raw_payload.clone(),
                     device_info: punch.device_info.clone(),
                     initiator_id: punch.initiator_id.clone(),
                     created_at }
    }
}

impl<C: Clock> PunchEventStore for InMemoryPunchStore<C> {
    fn submit_punch(&self, ctx: &IngestContext, punch: &PunchSubmission) -> Result<Uuid, StoreError> {
        ctx.check()?;
        let key = (punch.tenant_id.clone(), punch.provider, punch.request_id.clone());
        let event_id = match self.events.entry(key) {
            Entry::Occupied(existing) => {
                debug!("submit_punch:duplicate request_id={} event_id={}",
                       punch.request_id,
                       existing.get().event_id);
                existing.get().event_id
            }
            Entry::Vacant(slot) => {
                let event = self.materialize(punch, self.clock.now());
                let id = event.event_id;
                slot.insert(event);
                id
            }
        };
        Ok(event_id)
    }
}
