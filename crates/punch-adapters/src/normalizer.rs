//! Contrato de normalización y utilidades compartidas por los proveedores.
//!
//! Reglas comunes:
//! - Todo o nada: un registro inválido invalida el payload completo, así el
//!   llamador puede pedir un reenvío en lugar de perder el registro.
//! - Los timestamps del proveedor son epoch (ms o s) y se convierten a
//!   instantes UTC; nunca se interpretan como hora local.
//! - La salida es determinista para el mismo payload y el mismo event id.
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use punch_domain::json::{kind_of, require_non_empty};
use punch_domain::{DomainError, ExternalPunch, Provider};
use serde_json::{Map, Value};

use crate::{DingTalkCheckRecordNormalizer, WeComCheckinNormalizer};

pub trait PayloadNormalizer: Send + Sync {
    fn provider(&self) -> Provider;

    /// Normaliza un payload ya parseado.
    fn normalize_value(&self, event_id: &str, corp_id: &str, payload: &Value) -> Result<Vec<ExternalPunch>, DomainError>;

    /// Normaliza los bytes crudos de una entrega.
    fn normalize(&self, event_id: &str, corp_id: &str, payload: &[u8]) -> Result<Vec<ExternalPunch>, DomainError> {
        let value: Value = serde_json::from_slice(payload).map_err(|e| DomainError::InvalidJson { field: "payload",
                                                                                                  reason: e.to_string() })?;
        self.normalize_value(event_id, corp_id, &value)
    }
}

pub fn normalizer_for(provider: Provider) -> Box<dyn PayloadNormalizer> {
    match provider {
        Provider::DingTalk => Box::new(DingTalkCheckRecordNormalizer),
        Provider::WeCom => Box::new(WeComCheckinNormalizer),
    }
}

/// Identificadores de la entrega, ya validados y recortados.
pub(crate) struct DeliveryIds {
    pub event_id: String,
    pub corp_id: String,
}

impl DeliveryIds {
    pub fn new(event_id: &str, corp_id: &str) -> Result<Self, DomainError> {
        Ok(Self { event_id: require_non_empty("event_id", event_id)?,
                  corp_id: require_non_empty("corp_id", corp_id)? })
    }
}

/// Localiza la lista de registros: el payload mismo si es un array, o la
/// primera ruta presente. Sin lista => cero registros.
pub(crate) fn locate_records<'a>(payload: &'a Value, paths: &[&[&str]]) -> Result<&'a [Value], DomainError> {
    if let Value::Array(items) = payload {
        return Ok(items);
    }
    if !payload.is_object() {
        return Err(DomainError::InvalidJson { field: "payload",
                                              reason: format!("expected object or array, got {}", kind_of(payload)) });
    }
    for path in paths {
        let mut current = Some(payload);
        for key in path.iter() {
            current = current.and_then(|v| v.get(*key));
        }
        match current {
            None | Some(Value::Null) => continue,
            Some(Value::Array(items)) => return Ok(items),
            Some(other) => {
                return Err(DomainError::validation(format!("{} must be an array, got {}",
                                                           path.join("."),
                                                           kind_of(other))))
            }
        }
    }
    Ok(&[])
}

pub(crate) fn as_record(index: usize, value: &Value) -> Result<&Map<String, Value>, DomainError> {
    value.as_object()
         .ok_or_else(|| DomainError::validation(format!("record[{index}] must be an object, got {}", kind_of(value))))
}

/// Texto de un campo: strings recortados y números como texto. Vacío => None.
pub(crate) fn text_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match record.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub(crate) fn required_text(index: usize, record: &Map<String, Value>, key: &str) -> Result<String, DomainError> {
    text_field(record, key).ok_or_else(|| DomainError::validation(format!("record[{index}].{key} is required")))
}

/// Entero epoch estrictamente positivo (número o string numérico).
pub(crate) fn positive_epoch(index: usize, record: &Map<String, Value>, key: &str) -> Result<i64, DomainError> {
    let raw = record.get(key)
                    .ok_or_else(|| DomainError::validation(format!("record[{index}].{key} is required")))?;
    let parsed = match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v > 0 => Ok(v),
        Some(v) => Err(DomainError::validation(format!("record[{index}].{key} must be positive, got {v}"))),
        None => Err(DomainError::validation(format!("record[{index}].{key} is not an integer timestamp"))),
    }
}

pub(crate) fn from_epoch_millis(index: usize, millis: i64) -> Result<DateTime<Utc>, DomainError> {
    Utc.timestamp_millis_opt(millis)
       .single()
       .ok_or_else(|| DomainError::validation(format!("record[{index}] timestamp out of range: {millis}")))
}

pub(crate) fn from_epoch_seconds(index: usize, seconds: i64) -> Result<DateTime<Utc>, DomainError> {
    Utc.timestamp_opt(seconds, 0)
       .single()
       .ok_or_else(|| DomainError::validation(format!("record[{index}] timestamp out of range: {seconds}")))
}

/// Copia los campos presentes (no nulos) renombrándolos `(origen, destino)`.
pub(crate) fn pick_fields(record: &Map<String, Value>, fields: &[(&str, &str)]) -> Map<String, Value> {
    let mut out = Map::new();
    for (src, dst) in fields {
        match record.get(*src) {
            None | Some(Value::Null) => {}
            Some(v) => {
                out.insert((*dst).to_string(), v.clone());
            }
        }
    }
    out
}

/// Snapshot de "última vista" común a todos los proveedores.
pub(crate) fn last_seen_snapshot(ids: &DeliveryIds, request_id: &str, punched_at: DateTime<Utc>) -> Value {
    let mut snap = Map::new();
    snap.insert("corp_id".into(), Value::String(ids.corp_id.clone()));
    snap.insert("event_id".into(), Value::String(ids.event_id.clone()));
    snap.insert("request_id".into(), Value::String(request_id.to_string()));
    snap.insert("punched_at".into(),
                Value::String(punched_at.to_rfc3339_opts(SecondsFormat::Millis, true)));
    Value::Object(snap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn locate_records_alternate_keys() {
        let top = json!([{"a": 1}]);
        assert_eq!(locate_records(&top, &[&["list"]]).unwrap().len(), 1);
        let nested = json!({"data": {"list": [{"a": 1}, {"a": 2}]}});
        assert_eq!(locate_records(&nested, &[&["list"], &["data", "list"]]).unwrap().len(), 2);
        let none = json!({"other": 1});
        assert!(locate_records(&none, &[&["list"]]).unwrap().is_empty());
        let wrong = json!({"list": {"a": 1}});
        assert!(locate_records(&wrong, &[&["list"]]).is_err());
        assert!(locate_records(&json!("x"), &[&["list"]]).is_err());
    }

    #[test]
    fn positive_epoch_accepts_numeric_strings() {
        let rec = json!({"t": "1570791880000", "z": 0, "n": -5, "f": 1.5, "b": true});
        let rec = rec.as_object().unwrap();
        assert_eq!(positive_epoch(0, rec, "t").unwrap(), 1_570_791_880_000);
        assert!(positive_epoch(0, rec, "z").is_err());
        assert!(positive_epoch(0, rec, "n").is_err());
        assert!(positive_epoch(0, rec, "f").is_err());
        assert!(positive_epoch(0, rec, "b").is_err());
        assert!(positive_epoch(0, rec, "missing").is_err());
    }

    #[test]
    fn text_field_trims_and_skips_blank() {
        let rec = json!({"a": "  x ", "b": "   ", "c": 12, "d": null});
        let rec = rec.as_object().unwrap();
        assert_eq!(text_field(rec, "a").as_deref(), Some("x"));
        assert_eq!(text_field(rec, "b"), None);
        assert_eq!(text_field(rec, "c").as_deref(), Some("12"));
        assert_eq!(text_field(rec, "d"), None);
    }
}
