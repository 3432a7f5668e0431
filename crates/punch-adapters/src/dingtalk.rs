//! DingTalk: evento `attendance_check_record` (webhook).
//!
//! Forma esperada (la lista puede venir en `dataList`, `DataList`, `list`,
//! `data.list` o como array de nivel superior):
//!
//! ```json
//! {"dataList":[{"userId":"u1","checkTime":1570791880000,"bizId":"b1","checkByUser":true}]}
//! ```
//!
//! `checkTime` está en epoch milisegundos. `checkType` (si viene) usa el
//! vocabulario `OnDuty`/`OffDuty`; el evento de webhook normalmente no lo trae
//! y el marcaje queda como `RAW`.
use punch_domain::{DomainError, ExternalPunch, Provider, PunchType};
use serde_json::{Map, Value};

use crate::normalizer::{as_record, from_epoch_millis, last_seen_snapshot, locate_records, pick_fields,
                        positive_epoch, required_text, text_field, DeliveryIds, PayloadNormalizer};

pub const EVENT_TYPE: &str = "attendance_check_record";

const RECORD_PATHS: &[&[&str]] = &[&["dataList"], &["DataList"], &["list"], &["data", "list"]];

const DEVICE_FIELDS: &[(&str, &str)] = &[("deviceId", "device_id"),
                                         ("deviceSN", "device_sn"),
                                         ("locationMethod", "location_method"),
                                         ("userAddress", "address"),
                                         ("userLatitude", "latitude"),
                                         ("userLongitude", "longitude"),
                                         ("userAccuracy", "accuracy")];

const METADATA_FIELDS: &[(&str, &str)] = &[("checkByUser", "check_by_user"),
                                           ("checkType", "check_type"),
                                           ("locationResult", "location_result"),
                                           ("timeResult", "time_result"),
                                           ("sourceType", "source_type")];

#[derive(Debug, Clone, Copy, Default)]
pub struct DingTalkCheckRecordNormalizer;

/// `OnDuty` -> IN, `OffDuty` -> OUT; cualquier otro valor (o ausencia) -> RAW.
pub fn map_check_type(raw: Option<&str>) -> PunchType {
    match raw.map(str::trim) {
        Some(t) if t.eq_ignore_ascii_case("OnDuty") => PunchType::In,
        Some(t) if t.eq_ignore_ascii_case("OffDuty") => PunchType::Out,
        _ => PunchType::Raw,
    }
}

pub fn request_id(event_id: &str, biz_id: &str) -> String {
    format!("{}:{}:{}:{}", Provider::DingTalk.as_str(), EVENT_TYPE, event_id, biz_id)
}

impl PayloadNormalizer for DingTalkCheckRecordNormalizer {
    fn provider(&self) -> Provider {
        Provider::DingTalk
    }

    fn normalize_value(&self, event_id: &str, corp_id: &str, payload: &Value) -> Result<Vec<ExternalPunch>, DomainError> {
        let ids = DeliveryIds::new(event_id, corp_id)?;
        let records = locate_records(payload, RECORD_PATHS)?;
        records.iter()
               .enumerate()
               .map(|(index, raw)| normalize_record(&ids, index, raw))
               .collect()
    }
}

fn normalize_record(ids: &DeliveryIds, index: usize, raw: &Value) -> Result<ExternalPunch, DomainError> {
    let record = as_record(index, raw)?;
    let external_user_id = required_text(index, record, "userId")?;
    let check_time = positive_epoch(index, record, "checkTime")?;
    let biz_id = required_text(index, record, "bizId")?;
    let punched_at = from_epoch_millis(index, check_time)?;
    let punch_type = map_check_type(text_field(record, "checkType").as_deref());
    let request_id = request_id(&ids.event_id, &biz_id);

    let mut payload = Map::new();
    payload.insert("corp_id".into(), Value::String(ids.corp_id.clone()));
    payload.insert("event_id".into(), Value::String(ids.event_id.clone()));
    payload.insert("event_type".into(), Value::String(EVENT_TYPE.into()));
    payload.insert("biz_id".into(), Value::String(biz_id));
    payload.extend(pick_fields(record, METADATA_FIELDS));

    let last_seen_payload = last_seen_snapshot(ids, &request_id, punched_at);
    Ok(ExternalPunch { provider: Provider::DingTalk,
                       external_user_id,
                       punched_at,
                       punch_type,
                       request_id,
                       payload: Value::Object(payload),
                       raw_payload: raw.clone(),
                       device_info: Value::Object(pick_fields(record, DEVICE_FIELDS)),
                       last_seen_payload })
}
