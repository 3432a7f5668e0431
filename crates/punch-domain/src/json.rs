//! Helpers de validación para campos de texto y payloads JSON.
//!
//! Los payloads que viajan hacia almacenamiento (payload normalizado, payload
//! crudo, info de dispositivo, snapshot de última vista) deben ser siempre
//! objetos JSON. Un campo ausente equivale a `{}`; un array o escalar se
//! rechaza (incluido `null` explícito).

use serde_json::{Map, Value};

use crate::DomainError;

/// Devuelve el valor recortado o error si queda vacío.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Valida que `value` sea un objeto JSON; `None` se normaliza a `{}`.
pub fn object_or_empty(field: &'static str, value: Option<&Value>) -> Result<Value, DomainError> {
    match value {
        None => Ok(Value::Object(Map::new())),
        Some(Value::Object(map)) => Ok(Value::Object(map.clone())),
        Some(other) => Err(DomainError::InvalidJson { field,
                                                      reason: format!("expected object, got {}", kind_of(other)) }),
    }
}

/// Nombre corto del tipo JSON, para mensajes de error.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
