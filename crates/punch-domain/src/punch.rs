// punch.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{DomainError, Provider};

/// Tipo de marcaje normalizado.
///
/// `Raw` es el valor seguro para auditoría cuando el vocabulario del
/// proveedor no se puede traducir: nunca se rechaza un marcaje por dirección
/// desconocida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PunchType {
    In,
    Out,
    Raw,
}

impl PunchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunchType::In => "IN",
            PunchType::Out => "OUT",
            PunchType::Raw => "RAW",
        }
    }
}

impl FromStr for PunchType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "IN" => Ok(PunchType::In),
            "OUT" => Ok(PunchType::Out),
            "RAW" => Ok(PunchType::Raw),
            "" => Err(DomainError::validation("punch_type is required")),
            other => Err(DomainError::validation(format!("unsupported punch_type: {other}"))),
        }
    }
}

impl fmt::Display for PunchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marcaje externo ya normalizado, producido por un normalizador de
/// proveedor y consumido por el orquestador. No se persiste tal cual.
///
/// Invariantes (garantizadas por los normalizadores):
/// - `external_user_id` y `request_id` no vacíos.
/// - `punched_at` es un instante UTC posterior a la época.
/// - `payload`, `raw_payload`, `device_info` y `last_seen_payload` son objetos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPunch {
    pub provider: Provider,
    pub external_user_id: String,
    pub punched_at: DateTime<Utc>,
    pub punch_type: PunchType,
    /// Clave de idempotencia determinista.
    pub request_id: String,
    /// Metadatos normalizados para lógica de negocio aguas abajo.
    pub payload: serde_json::Value,
    /// Registro original del proveedor (auditoría).
    pub raw_payload: serde_json::Value,
    pub device_info: serde_json::Value,
    /// Snapshot que se guarda como "última vista" del vínculo de identidad.
    pub last_seen_payload: serde_json::Value,
}

/// Evento de marcaje materializado (una fila por evento externo aceptado).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PunchEvent {
    pub event_id: uuid::Uuid,
    pub tenant_id: String,
    pub person_id: String,
    pub provider: Provider,
    pub punch_type: PunchType,
    pub punched_at: DateTime<Utc>,
    pub request_id: String,
    pub payload: serde_json::Value,
    pub raw_payload: serde_json::Value,
    pub device_info: serde_json::Value,
    /// Quién/qué disparó la escritura.
    pub initiator_id: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punch_type_parses_case_insensitive() {
        assert_eq!("in".parse::<PunchType>().unwrap(), PunchType::In);
        assert_eq!(" Out ".parse::<PunchType>().unwrap(), PunchType::Out);
        assert_eq!("raw".parse::<PunchType>().unwrap(), PunchType::Raw);
        assert!("".parse::<PunchType>().is_err());
        assert!("BREAK".parse::<PunchType>().is_err());
    }

    #[test]
    fn punch_type_serializes_upper() {
        assert_eq!(serde_json::to_string(&PunchType::Raw).unwrap(), "\"RAW\"");
    }
}
