//! Vínculo de identidad externa (tenant, proveedor, usuario externo).
//!
//! El pipeline sólo crea vínculos (`Pending`) y actualiza su bookkeeping de
//! "última vista". Las transiciones a `Active`/`Disabled`/`Ignored` las hace
//! un proceso administrativo externo.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{DomainError, Provider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// Visto pero sin persona asignada todavía.
    Pending,
    /// Mapeado a una persona interna.
    Active,
    /// Desactivado explícitamente.
    Disabled,
    /// Excluido explícitamente de la ingesta.
    Ignored,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Pending => "pending",
            LinkStatus::Active => "active",
            LinkStatus::Disabled => "disabled",
            LinkStatus::Ignored => "ignored",
        }
    }
}

impl FromStr for LinkStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Sólo la forma canónica: el almacenamiento guarda minúsculas.
        match s {
            "pending" => Ok(LinkStatus::Pending),
            "active" => Ok(LinkStatus::Active),
            "disabled" => Ok(LinkStatus::Disabled),
            "ignored" => Ok(LinkStatus::Ignored),
            _ => Err(DomainError::validation(format!("unrecognized link status: {s}"))),
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estado completo de un vínculo, tal como lo guarda el almacenamiento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityLink {
    pub tenant_id: String,
    pub provider: Provider,
    pub external_user_id: String,
    pub status: LinkStatus,
    pub person_id: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub seen_count: i64,
    pub last_seen_payload: serde_json::Value,
}

/// Resultado post-actualización de `touch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkResolution {
    pub status: LinkStatus,
    pub person_id: Option<String>,
}
