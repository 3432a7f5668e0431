//! Camino pull: consulta de marcajes de WeCom por ventana de tiempo.
//!
//! El puller no reintenta. Si el proveedor rechaza el token, invalida la
//! caché y devuelve `PullError::Unauthorized`; el siguiente intento del
//! llamador obtendrá un token nuevo.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use punch_domain::{DomainError, ExternalPunch};
use serde_json::{json, Value};

use crate::error::PullError;
use crate::normalizer::PayloadNormalizer;
use crate::token::TokenSource;
use crate::wecom::WeComCheckinNormalizer;

/// Límite de usuarios por consulta que acepta la API de WeCom.
pub const MAX_USERS_PER_QUERY: usize = 100;
/// Ventana máxima por consulta (días).
pub const MAX_WINDOW_DAYS: i64 = 30;
/// Correlation id usado en los request ids de registros obtenidos por pull.
/// Es fijo para que dos ventanas solapadas produzcan las mismas claves.
pub const PULL_EVENT_ID: &str = "pull";

#[async_trait]
pub trait CheckinQuery: Send + Sync {
    async fn get_checkin_data(&self,
                              token: &str,
                              start: DateTime<Utc>,
                              end: DateTime<Utc>,
                              user_ids: &[String])
                              -> Result<Vec<Value>, PullError>;
}

pub struct CheckinPuller<T, Q> {
    tokens: T,
    query: Q,
    normalizer: WeComCheckinNormalizer,
}

impl<T: TokenSource, Q: CheckinQuery> CheckinPuller<T, Q> {
    pub fn new(tokens: T, query: Q) -> Self {
        Self { tokens,
               query,
               normalizer: WeComCheckinNormalizer }
    }

    /// Obtiene y normaliza los marcajes de `user_ids` en `[start, end)`.
    /// Todo o nada: cualquier registro inválido falla la llamada completa.
    pub async fn pull(&self,
                      corp_id: &str,
                      start: DateTime<Utc>,
                      end: DateTime<Utc>,
                      user_ids: &[String])
                      -> Result<Vec<ExternalPunch>, PullError> {
        if start >= end {
            return Err(DomainError::validation("pull window start must be before end").into());
        }
        if end - start > Duration::days(MAX_WINDOW_DAYS) {
            return Err(DomainError::validation(format!("pull window exceeds {MAX_WINDOW_DAYS} days")).into());
        }
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let token = self.tokens.get_token().await?;
        let mut records = Vec::new();
        for chunk in user_ids.chunks(MAX_USERS_PER_QUERY) {
            match self.query.get_checkin_data(&token.token, start, end, chunk).await {
                Ok(batch) => records.extend(batch),
                Err(PullError::Unauthorized(msg)) => {
                    warn!("pull:token rejected corp_id={corp_id}; invalidating cache");
                    self.tokens.invalidate().await;
                    return Err(PullError::Unauthorized(msg));
                }
                Err(e) => return Err(e),
            }
        }
        debug!("pull:fetched corp_id={corp_id} records={}", records.len());
        let payload = json!({ "checkindata": records });
        Ok(self.normalizer.normalize_value(PULL_EVENT_ID, corp_id, &payload)?)
    }
}
