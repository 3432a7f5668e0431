//! punch-core: resolución de identidad e ingesta idempotente de marcajes.
//!
//! Componentes:
//! - `resolver`: `IdentityResolver`, registra cada avistamiento y devuelve el
//!   estado post-actualización del vínculo.
//! - `submitter`: `PunchSubmitter`, escritura idempotente por request id.
//! - `orchestrator`: `IngestOrchestrator`, decisión por marcaje.
//! - `store`: capacidades de almacenamiento (traits) y backend en memoria.
//! - `context`: deadline y cancelación que se propagan hasta el store.
//! - `clock`: reloj inyectable.
pub mod clock;
pub mod context;
pub mod errors;
pub mod orchestrator;
pub mod resolver;
pub mod store;
pub mod submitter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::IngestContext;
pub use tokio_util::sync::CancellationToken;
pub use errors::{classify_error, CoreError, ErrorClass};
pub use orchestrator::IngestOrchestrator;
pub use resolver::IdentityResolver;
pub use store::{IdentityLinkStore, InMemoryLinkStore, InMemoryPunchStore, LinkRow, PunchEventStore, StoreError};
pub use submitter::PunchSubmitter;
