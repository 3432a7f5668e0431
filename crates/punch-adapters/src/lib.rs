//! punch-adapters: capa de adaptación Proveedor ↔ Core
//!
//! Este crate provee:
//! - Normalizadores por proveedor (`dingtalk`, `wecom`) que convierten un
//!   payload crudo en `ExternalPunch` sin I/O.
//! - La caché de tokens de acceso (`token`) con reloj inyectado.
//! - El camino "pull" (`pull`): consulta de marcajes vía API y normalización
//!   con el mismo contrato que los webhooks.
//!
//! Nota: los clientes HTTP reales (token y consulta de marcajes) viven fuera
//! de este crate; aquí sólo se definen sus capacidades como traits.

pub mod dingtalk;
pub mod error;
pub mod normalizer;
pub mod pull;
pub mod token;
pub mod wecom;

pub use dingtalk::DingTalkCheckRecordNormalizer;
pub use error::PullError;
pub use normalizer::{normalizer_for, PayloadNormalizer};
pub use pull::{CheckinPuller, CheckinQuery};
pub use token::{AccessToken, CachedTokenSource, TokenSource};
pub use wecom::WeComCheckinNormalizer;
