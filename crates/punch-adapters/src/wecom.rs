//! WeCom: datos de marcaje (`checkindata`), vía webhook reenviado o pull.
//!
//! Forma esperada (lista en `checkindata`, `list`, `data.list` o array de
//! nivel superior):
//!
//! ```json
//! {"checkindata":[{"userid":"zhangsan","checkin_type":"上班打卡","checkin_time":1492617610}]}
//! ```
//!
//! `checkin_time` está en epoch segundos. Los registros de WeCom no traen id
//! propio: el identificador secundario del request id es `userid:checkin_time`.
use punch_domain::{DomainError, ExternalPunch, Provider, PunchType};
use serde_json::{Map, Value};

use crate::normalizer::{as_record, from_epoch_seconds, last_seen_snapshot, locate_records, pick_fields,
                        positive_epoch, required_text, text_field, DeliveryIds, PayloadNormalizer};

pub const EVENT_TYPE: &str = "checkin_data";

const RECORD_PATHS: &[&[&str]] = &[&["checkindata"], &["list"], &["data", "list"]];

const DEVICE_FIELDS: &[(&str, &str)] = &[("deviceid", "device_id"),
                                         ("wifiname", "wifi_name"),
                                         ("wifimac", "wifi_mac"),
                                         ("location_title", "location_title"),
                                         ("location_detail", "location_detail"),
                                         ("lat", "latitude"),
                                         ("lng", "longitude")];

const METADATA_FIELDS: &[(&str, &str)] = &[("checkin_type", "checkin_type"),
                                           ("exception_type", "exception_type"),
                                           ("groupname", "group_name"),
                                           ("groupid", "group_id"),
                                           ("sch_checkin_time", "scheduled_checkin_time"),
                                           ("notes", "notes")];

#[derive(Debug, Clone, Copy, Default)]
pub struct WeComCheckinNormalizer;

/// `上班打卡` (entrada) -> IN, `下班打卡` (salida) -> OUT; el resto
/// (`外出打卡`, tipos nuevos, ausencia) -> RAW.
pub fn map_checkin_type(raw: Option<&str>) -> PunchType {
    match raw.map(str::trim) {
        Some("上班打卡") => PunchType::In,
        Some("下班打卡") => PunchType::Out,
        _ => PunchType::Raw,
    }
}

pub fn request_id(event_id: &str, user_id: &str, checkin_time: i64) -> String {
    format!("{}:{}:{}:{}:{}", Provider::WeCom.as_str(), EVENT_TYPE, event_id, user_id, checkin_time)
}

impl PayloadNormalizer for WeComCheckinNormalizer {
    fn provider(&self) -> Provider {
        Provider::WeCom
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
    let external_user_id = required_text(index, record, "userid")?;
    let checkin_time = positive_epoch(index, record, "checkin_time")?;
    let punched_at = from_epoch_seconds(index, checkin_time)?;
    let punch_type = map_checkin_type(text_field(record, "checkin_type").as_deref());
    let request_id = request_id(&ids.event_id, &external_user_id, checkin_time);

    let mut payload = Map::new();
    payload.insert("corp_id".into(), Value::String(ids.corp_id.clone()));
    payload.insert("event_id".into(), Value::String(ids.event_id.clone()));
    payload.insert("event_type".into(), Value::String(EVENT_TYPE.into()));
    payload.extend(pick_fields(record, METADATA_FIELDS));

    let last_seen_payload = last_seen_snapshot(ids, &request_id, punched_at);
    Ok(ExternalPunch { provider: Provider::WeCom,
                       external_user_id,
                       punched_at,
                       punch_type,
                       request_id,
                       payload: Value::Object(payload),
                       raw_payload: raw.clone(),
                       device_info: Value::Object(pick_fields(record, DEVICE_FIELDS)),
                       last_seen_payload })
}
