//! Parámetros de entrada de las dos operaciones de almacenamiento y su
//! validación previa a cualquier I/O.
//!
//! `TouchLinkParams` / `SubmitPunchParams` reciben texto tal como llega del
//! llamador; `validate()` produce las formas normalizadas (`LinkTouch`,
//! `PunchSubmission`) que son las únicas que aceptan los stores.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json::{object_or_empty, require_non_empty};
use crate::{DomainError, Provider, PunchType};

#[derive(Debug, Clone)]
pub struct TouchLinkParams<'a> {
    pub tenant_id: &'a str,
    pub provider: &'a str,
    pub external_user_id: &'a str,
    pub last_seen_payload: Option<&'a Value>,
}

/// Avistamiento validado de un usuario externo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTouch {
    pub tenant_id: String,
    pub provider: Provider,
    pub external_user_id: String,
    pub last_seen_payload: Value,
}

impl TouchLinkParams<'_> {
    pub fn validate(&self) -> Result<LinkTouch, DomainError> {
        let tenant_id = require_non_empty("tenant_id", self.tenant_id)?;
        let provider: Provider = self.provider.parse()?;
        let external_user_id = require_non_empty("external_user_id", self.external_user_id)?;
        let last_seen_payload = object_or_empty("last_seen_payload", self.last_seen_payload)?;
        Ok(LinkTouch { tenant_id,
                       provider,
                       external_user_id,
                       last_seen_payload })
    }
}

#[derive(Debug, Clone)]
pub struct SubmitPunchParams<'a> {
    pub tenant_id: &'a str,
    pub person_id: &'a str,
    pub initiator_id: &'a str,
    pub provider: &'a str,
    pub punch_type: &'a str,
    pub punched_at: DateTime<Utc>,
    pub request_id: &'a str,
    pub payload: Option<&'a Value>,
    pub raw_payload: Option<&'a Value>,
    pub device_info: Option<&'a Value>,
}

/// Marcaje validado, listo para la inserción idempotente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchSubmission {
    pub tenant_id: String,
    pub person_id: String,
    pub initiator_id: String,
    pub provider: Provider,
    pub punch_type: PunchType,
    pub punched_at: DateTime<Utc>,
    pub request_id: String,
    pub payload: Value,
    pub raw_payload: Value,
    pub device_info: Value,
}

impl SubmitPunchParams<'_> {
    pub fn validate(&self) -> Result<PunchSubmission, DomainError> {
        let tenant_id = require_non_empty("tenant_id", self.tenant_id)?;
        let person_id = require_non_empty("person_id", self.person_id)?;
        let initiator_id = require_non_empty("initiator_id", self.initiator_id)?;
        let request_id = require_non_empty("request_id", self.request_id)?;
        let provider: Provider = self.provider.parse()?;
        let punch_type: PunchType = self.punch_type.parse()?;
        if self.punched_at.timestamp_millis() <= 0 {
            return Err(DomainError::validation("punched_at must be after the unix epoch"));
        }
        let payload = object_or_empty("payload", self.payload)?;
        let raw_payload = object_or_empty("raw_payload", self.raw_payload)?;
        let device_info = object_or_empty("device_info", self.device_info)?;
        Ok(PunchSubmission { tenant_id,
                             person_id,
                             initiator_id,
                             provider,
                             punch_type,
                             punched_at: self.punched_at,
                             request_id,
                             payload,
                             raw_payload,
                             device_info })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn submit_params<'a>(payload: Option<&'a Value>) -> SubmitPunchParams<'a> {
        SubmitPunchParams { tenant_id: " corp1 ",
                            person_id: "p1",
                            initiator_id: "ingest",
                            provider: "DingTalk",
                            punch_type: "in",
                            punched_at: Utc.timestamp_millis_opt(1_570_791_880_000).unwrap(),
                            request_id: "dingtalk:attendance_check_record:e1:b1",
                            payload,
                            raw_payload: None,
                            device_info: None }
    }

    #[test]
    fn submit_params_normalize() {
        let sub = submit_params(None).validate().unwrap();
        assert_eq!(sub.tenant_id, "corp1");
        assert_eq!(sub.provider, Provider::DingTalk);
        assert_eq!(sub.punch_type, PunchType::In);
        assert_eq!(sub.payload, json!({}));
        assert_eq!(sub.raw_payload, json!({}));
        assert_eq!(sub.device_info, json!({}));
    }

    #[test]
    fn submit_params_reject_bad_input() {
        let arr = json!([]);
        assert!(matches!(submit_params(Some(&arr)).validate(),
                         Err(DomainError::InvalidJson { field: "payload", .. })));

        let mut p = submit_params(None);
        p.request_id = "  ";
        assert!(p.validate().is_err());

        let mut p = submit_params(None);
        p.initiator_id = "";
        assert!(p.validate().is_err());

        let mut p = submit_params(None);
        p.punched_at = Utc.timestamp_millis_opt(0).unwrap();
        assert!(p.validate().is_err());

        let mut p = submit_params(None);
        p.provider = "feishu";
        assert!(matches!(p.validate(), Err(DomainError::UnknownProvider(_))));

        let mut p = submit_params(None);
        p.punch_type = " ";
        assert!(p.validate().is_err());
    }

    #[test]
    fn touch_params_validate() {
        let snap = json!({"event_id": "e1"});
        let touch = TouchLinkParams { tenant_id: "corp1",
                                      provider: " wecom",
                                      external_user_id: " u1 ",
                                      last_seen_payload: Some(&snap) }.validate()
                                                                        .unwrap();
        assert_eq!(touch.provider, Provider::WeCom);
        assert_eq!(touch.external_user_id, "u1");
        assert_eq!(touch.last_seen_payload, snap);

        let scalar = json!(42);
        let err = TouchLinkParams { tenant_id: "corp1",
                                    provider: "wecom",
                                    external_user_id: "u1",
                                    last_seen_payload: Some(&scalar) }.validate();
        assert!(err.is_err());

        let err = TouchLinkParams { tenant_id: "",
                                    provider: "wecom",
                                    external_user_id: "u1",
                                    last_seen_payload: None }.validate();
        assert!(err.is_err());
    }
}
