use std::sync::Arc;

use chrono::{TimeZone, Utc};
use punch_core::{classify_error, CoreError, ErrorClass, IdentityLinkStore, IngestContext, IngestOrchestrator,
                 InMemoryLinkStore, InMemoryPunchStore, LinkRow, PunchEventStore, PunchSubmitter, StoreError};
use punch_domain::{ExternalPunch, IngestOutcome, LinkStatus, LinkTouch, Provider, PunchType};
use serde_json::json;

fn punch(external_user_id: &str, request_id: &str) -> ExternalPunch {
    ExternalPunch { provider: Provider::DingTalk,
                    external_user_id: external_user_id.to_string(),
                    punched_at: Utc.timestamp_millis_opt(1_570_791_880_000).unwrap(),
                    punch_type: PunchType::Raw,
                    request_id: request_id.to_string(),
                    payload: json!({"corp_id": "corp1", "event_id": "e1"}),
                    raw_payload: json!({"userId": external_user_id, "bizId": "b1"}),
                    device_info: json!({}),
                    last_seen_payload: json!({"event_id": "e1"}) }
}

fn setup() -> (Arc<InMemoryLinkStore>,
               Arc<InMemoryPunchStore>,
               IngestOrchestrator<Arc<InMemoryLinkStore>, Arc<InMemoryPunchStore>>) {
    let links = Arc::new(InMemoryLinkStore::new());
    let punches = Arc::new(InMemoryPunchStore::new());
    let orch = IngestOrchestrator::new(links.clone(), punches.clone());
    (links, punches, orch)
}

#[test]
fn new_external_user_is_unmapped_and_link_created() {
    let (links, punches, orch) = setup();
    let res = orch.ingest(&IngestContext::background(), "corp1", "ingest", &punch("u1", "r1")).unwrap();
    assert_eq!(res.outcome, IngestOutcome::Unmapped);
    assert_eq!(res.status, LinkStatus::Pending);
    assert_eq!(res.person_id, None);
    assert_eq!(res.event_id, None);
    assert!(punches.is_empty(), "no punch event for unmapped users");
    let link = links.get("corp1", Provider::DingTalk, "u1").unwrap();
    assert_eq!(link.seen_count, 1);
    assert_eq!(link.status, LinkStatus::Pending);
}

#[test]
fn active_link_with_person_is_ingested() {
    let (links, punches, orch) = setup();
    let ctx = IngestContext::background();
    orch.ingest(&ctx, "corp1", "ingest", &punch("u1", "r0")).unwrap();
    links.set_link_state("corp1", Provider::DingTalk, "u1", LinkStatus::Active, Some("p1".into()));

    let res = orch.ingest(&ctx, "corp1", "ingest", &punch("u1", "r1")).unwrap();
    assert_eq!(res.outcome, IngestOutcome::Ingested);
    assert_eq!(res.person_id.as_deref(), Some("p1"));
    let event_id = res.event_id.expect("event id");
    let stored = punches.get("corp1", Provider::DingTalk, "r1").unwrap();
    assert_eq!(stored.event_id, event_id);
    assert_eq!(stored.person_id, "p1");
    assert_eq!(stored.initiator_id, "ingest");
    assert_eq!(stored.punch_type, PunchType::Raw);
    assert_eq!(stored.raw_payload["bizId"], "b1");
}

#[test]
fn redelivery_yields_same_event_and_single_row() {
    let (links, punches, orch) = setup();
    let ctx = IngestContext::background();
    orch.ingest(&ctx, "corp1", "ingest", &punch("u1", "r0")).unwrap();
    links.set_link_state("corp1", Provider::DingTalk, "u1", LinkStatus::Active, Some("p1".into()));

    let first = orch.ingest(&ctx, "corp1", "ingest", &punch("u1", "r1")).unwrap();
    let second = orch.ingest(&ctx, "corp1", "ingest", &punch("u1", "r1")).unwrap();
    assert_eq!(first.event_id, second.event_id);
    assert_eq!(punches.len(), 1);
    // Cada entrega cuenta como avistamiento.
    assert_eq!(links.get("corp1", Provider::DingTalk, "u1").unwrap().seen_count, 3);
}

#[test]
fn ignored_and_disabled_links_are_recorded_but_not_ingested() {
    let (links, punches, orch) = setup();
    let ctx = IngestContext::background();
    orch.ingest(&ctx, "corp1", "ingest", &punch("u-ign", "r0")).unwrap();
    orch.ingest(&ctx, "corp1", "ingest", &punch("u-dis", "r1")).unwrap();
    links.set_link_state("corp1", Provider::DingTalk, "u-ign", LinkStatus::Ignored, None);
    links.set_link_state("corp1", Provider::DingTalk, "u-dis", LinkStatus::Disabled, Some("p9".into()));

    let ign = orch.ingest(&ctx, "corp1", "ingest", &punch("u-ign", "r2")).unwrap();
    assert_eq!(ign.outcome, IngestOutcome::Ignored);
    let dis = orch.ingest(&ctx, "corp1", "ingest", &punch("u-dis", "r3")).unwrap();
    assert_eq!(dis.outcome, IngestOutcome::Disabled);
    assert_eq!(dis.person_id.as_deref(), Some("p9"));
    assert_eq!(dis.event_id, None);
    assert!(punches.is_empty());
    assert_eq!(links.get("corp1", Provider::DingTalk, "u-dis").unwrap().seen_count, 2);
}

#[test]
fn active_link_without_person_is_integrity_error() {
    let (links, punches, orch) = setup();
    let ctx = IngestContext::background();
    orch.ingest(&ctx, "corp1", "ingest", &punch("u1", "r0")).unwrap();
    links.set_link_state("corp1", Provider::DingTalk, "u1", LinkStatus::Active, None);

    let err = orch.ingest(&ctx, "corp1", "ingest", &punch("u1", "r1")).unwrap_err();
    assert!(matches!(err, CoreError::ActiveWithoutPerson { ref external_user_id, .. } if external_user_id == "u1"));
    assert_eq!(classify_error(&err), ErrorClass::Integrity);
    assert!(punches.is_empty());
    // El avistamiento quedó registrado de todos modos.
    assert_eq!(links.get("corp1", Provider::DingTalk, "u1").unwrap().seen_count, 2);
}

/// Store que devuelve un estado fijo, para cubrir valores fuera del enum.
struct FixedStatusStore(&'static str, Option<&'static str>);

impl IdentityLinkStore for FixedStatusStore {
    fn touch_link(&self, _ctx: &IngestContext, _touch: &LinkTouch) -> Result<LinkRow, StoreError> {
        Ok(LinkRow { status: self.0.to_string(),
                     person_id: self.1.map(str::to_string) })
    }
}

#[test]
fn unrecognized_status_is_integrity_error() {
    let punches = Arc::new(InMemoryPunchStore::new());
    let orch = IngestOrchestrator::new(FixedStatusStore("archived", Some("p1")), punches.clone());
    let err = orch.ingest(&IngestContext::background(), "corp1", "ingest", &punch("u1", "r1")).unwrap_err();
    assert_eq!(err, CoreError::UnrecognizedStatus("archived".into()));
    assert!(punches.is_empty());
}

#[test]
fn non_canonical_status_case_is_integrity_error() {
    let punches = Arc::new(InMemoryPunchStore::new());
    for stored in ["ACTIVE", "Active", " active"] {
        let orch = IngestOrchestrator::new(FixedStatusStore(stored, Some("p1")), punches.clone());
        let err = orch.ingest(&IngestContext::background(), "corp1", "ingest", &punch("u1", "r1")).unwrap_err();
        assert_eq!(err, CoreError::UnrecognizedStatus(stored.into()));
        assert_eq!(classify_error(&err), ErrorClass::Integrity);
    }
    assert!(punches.is_empty());
}

#[test]
fn blank_person_id_counts_as_absent() {
    let orch = IngestOrchestrator::new(FixedStatusStore("active", Some("  ")), InMemoryPunchStore::new());
    let err = orch.ingest(&IngestContext::background(), "corp1", "ingest", &punch("u1", "r1")).unwrap_err();
    assert!(matches!(err, CoreError::ActiveWithoutPerson { .. }));
}

/// Store que falla siempre, para verificar propagación sin efectos.
struct FailingPunchStore;

impl PunchEventStore for FailingPunchStore {
    fn submit_punch(&self,
                    _ctx: &IngestContext,
                    _punch: &punch_domain::PunchSubmission)
                    -> Result<uuid::Uuid, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[test]
fn storage_failure_on_submit_is_retryable() {
    let orch = IngestOrchestrator::new(FixedStatusStore("active", Some("p1")), FailingPunchStore);
    let err = orch.ingest(&IngestContext::background(), "corp1", "ingest", &punch("u1", "r1")).unwrap_err();
    assert_eq!(classify_error(&err), ErrorClass::Retryable);
}

#[test]
fn validation_failures_have_no_side_effects() {
    let (links, punches, orch) = setup();
    let ctx = IngestContext::background();

    let err = orch.ingest(&ctx, "corp1", "ingest", &punch("   ", "r1")).unwrap_err();
    assert_eq!(classify_error(&err), ErrorClass::Validation);
    let err = orch.ingest(&ctx, " ", "ingest", &punch("u1", "r1")).unwrap_err();
    assert_eq!(classify_error(&err), ErrorClass::Validation);
    assert!(links.is_empty());

    let mut bad = punch("u1", "r1");
    bad.last_seen_payload = json!(["not", "an", "object"]);
    assert!(orch.ingest(&ctx, "corp1", "ingest", &bad).is_err());
    assert!(links.is_empty());

    // Enlace activo, pero device_info no es objeto: falla antes de escribir.
    orch.ingest(&ctx, "corp1", "ingest", &punch("u1", "r0")).unwrap();
    links.set_link_state("corp1", Provider::DingTalk, "u1", LinkStatus::Active, Some("p1".into()));
    let mut bad = punch("u1", "r1");
    bad.device_info = json!("scanner-7");
    let err = orch.ingest(&ctx, "corp1", "ingest", &bad).unwrap_err();
    assert_eq!(classify_error(&err), ErrorClass::Validation);
    let mut bad = punch("u1", "r1");
    bad.raw_payload = json!([{"userId": "u1"}]);
    let err = orch.ingest(&ctx, "corp1", "ingest", &bad).unwrap_err();
    assert_eq!(classify_error(&err), ErrorClass::Validation);
    let err = orch.ingest(&ctx, "corp1", "  ", &punch("u1", "r2")).unwrap_err();
    assert_eq!(classify_error(&err), ErrorClass::Validation);
    assert!(punches.is_empty());
}

#[test]
fn submitter_rejects_non_object_json_fields() {
    let punches = Arc::new(InMemoryPunchStore::new());
    let submitter = PunchSubmitter::new(punches.clone());
    let ctx = IngestContext::background();
    for field in ["payload", "raw_payload", "device_info"] {
        let mut bad = punch("u1", "r1");
        let value = json!(["not", "an", "object"]);
        match field {
            "payload" => bad.payload = value,
            "raw_payload" => bad.raw_payload = value,
            _ => bad.device_info = value,
        }
        let err = submitter.submit(&ctx, "corp1", "p1", &bad, "ingest").unwrap_err();
        assert_eq!(classify_error(&err), ErrorClass::Validation, "field {field}");
    }
    assert!(punches.is_empty());
}

#[test]
fn cancelled_context_aborts_before_any_write() {
    let (links, punches, orch) = setup();
    let ctx = IngestContext::background();
    ctx.cancel_token().cancel();
    let err = orch.ingest(&ctx, "corp1", "ingest", &punch("u1", "r1")).unwrap_err();
    assert_eq!(err, CoreError::Storage(StoreError::Cancelled));
    assert!(links.is_empty());
    assert!(punches.is_empty());
}
