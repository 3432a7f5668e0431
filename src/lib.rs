//! punchflow
//!
//! Librería de ingesta de marcajes de asistencia:
//! - `config`: `AppConfig` desde variables de entorno (.env).
//! - `errors`: errores de configuración y de entrega.
//! - `pipeline`: `IngestPipeline`, que une normalizadores y orquestador.

pub mod config;
pub mod errors;
pub mod pipeline;

pub use config::AppConfig;
pub use errors::{ConfigError, PipelineError};
pub use pipeline::IngestPipeline;

