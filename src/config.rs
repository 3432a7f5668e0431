//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y expone `AppConfig`.

use std::env;
use std::time::Duration;

use punch_persistence::config::{init_dotenv, DbConfig};

use crate::errors::ConfigError;

pub const DEFAULT_INITIATOR_ID: &str = "punchflow-ingest";

/// Configuración global de la aplicación.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Identidad registrada como `initiator_id` en cada evento.
    pub initiator_id: String,
    /// Deadline opcional por marcaje.
    pub punch_deadline: Option<Duration>,
    /// `None` si no hay `DATABASE_URL`: se usan los stores en memoria.
    pub database: Option<DbConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        init_dotenv();
        let initiator_id = match env::var("PUNCHFLOW_INITIATOR_ID") {
            Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => DEFAULT_INITIATOR_ID.to_string(),
        };
        let punch_deadline = match env::var("PUNCHFLOW_DEADLINE_MS") {
            Ok(v) => {
                let ms: u64 = v.trim().parse().map_err(|_| ConfigError::Invalid { key: "PUNCHFLOW_DEADLINE_MS",
                                                                                 value: v.clone() })?;
                (ms > 0).then(|| Duration::from_millis(ms))
            }
            Err(_) => None,
        };
        let database = if DbConfig::is_configured() { Some(DbConfig::from_env()?) } else { None };
        Ok(Self { initiator_id,
                  punch_deadline,
                  database })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { initiator_id: DEFAULT_INITIATOR_ID.to_string(),
               punch_deadline: None,
               database: None }
    }
}
