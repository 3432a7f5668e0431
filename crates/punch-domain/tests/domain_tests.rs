use punch_domain::{IngestOutcome, IngestResult, LinkStatus, Provider, PunchType};
use serde_json::json;

#[test]
fn test_link_status_roundtrip_strings() {
    for status in [LinkStatus::Pending, LinkStatus::Active, LinkStatus::Disabled, LinkStatus::Ignored] {
        assert_eq!(status.as_str().parse::<LinkStatus>().unwrap(), status);
    }
    assert!("archived".parse::<LinkStatus>().is_err());
    assert!("ACTIVE".parse::<LinkStatus>().is_err());
}

#[test]
fn test_provider_labels_are_stable() {
    // Las etiquetas forman parte de los request ids persistidos: no deben cambiar.
    assert_eq!(Provider::DingTalk.as_str(), "dingtalk");
    assert_eq!(Provider::WeCom.as_str(), "wecom");
    assert_eq!(Provider::ALL.len(), 2);
}

#[test]
fn test_ingest_result_serializes_lowercase_tags() {
    let res = IngestResult { outcome: IngestOutcome::Unmapped,
                             status: LinkStatus::Pending,
                             person_id: None,
                             event_id: None };
    let v = serde_json::to_value(&res).unwrap();
    assert_eq!(v, json!({"outcome": "unmapped", "status": "pending", "person_id": null, "event_id": null}));
    assert_eq!(serde_json::to_value(PunchType::Out).unwrap(), json!("OUT"));
}
