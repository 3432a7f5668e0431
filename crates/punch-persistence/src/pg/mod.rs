//! Implementaciones Postgres (Diesel) de los traits del core.
//!
//! - Cada operación corre en UNA transacción con el contexto de tenant fijado
//!   (`set_config('app.tenant_id', .., true)`), de modo que las políticas RLS
//!   de la migración acoten lo visible al tenant en curso.
//! - El deadline del `IngestContext` se traduce a `statement_timeout` local a
//!   la transacción; la cancelación se verifica antes de abrir y antes del
//!   commit. Cualquier error revierte la transacción completa.
//! - No hay reintentos internos: los errores se clasifican y se devuelven.

mod links;
mod punches;

pub use links::PgIdentityLinkStore;
pub use punches::PgPunchEventStore;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::sql_types::Text;
use log::{debug, warn};
use punch_core::IngestContext;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
///
/// Al construirlo (`build_pool`) se corre el set de migraciones pendientes una
/// sola vez.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real (producción/tests de integración) o algo
/// distinto en tests sin acoplar los stores a r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Conexión lista para Diesel, o `PersistenceError::TransientIo`.
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
#[derive(Clone)]
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Modo de la transacción de tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxMode {
    ReadWrite,
    ReadOnly,
}

/// Ejecuta `f` dentro de una transacción con tenant y deadline aplicados.
pub(crate) fn run_in_tenant_tx<P, T, F>(provider: &P,
                                        ctx: &IngestContext,
                                        tenant_id: &str,
                                        mode: TxMode,
                                        f: F)
                                        -> Result<T, PersistenceError>
    where P: ConnectionProvider + ?Sized,
          F: FnOnce(&mut PgConnection) -> Result<T, PersistenceError>
{
    ctx.check()?;
    let mut conn = provider.connection()?;
    let builder = conn.build_transaction();
    let mut builder = match mode {
        TxMode::ReadWrite => builder.read_write(),
        TxMode::ReadOnly => builder.read_only(),
    };
    let result = builder.run(|tx| {
                            set_tenant_context(tx, tenant_id)?;
                            if let Some(left) = ctx.remaining() {
                                set_statement_timeout(tx, left.as_millis())?;
                            }
                            let out = f(tx)?;
                            // último punto de abandono antes del commit
                            ctx.check()?;
                            Ok(out)
                        });
    if let Err(e) = &result {
        warn!("tenant tx rolled back tenant={tenant_id} err={e}");
    }
    result
}

fn set_tenant_context(tx: &mut PgConnection, tenant_id: &str) -> Result<(), PersistenceError> {
    diesel::sql_query("SELECT set_config('app.tenant_id', $1, true)").bind::<Text, _>(tenant_id)
                                                                      .execute(tx)?;
    Ok(())
}

fn set_statement_timeout(tx: &mut PgConnection, millis: u128) -> Result<(), PersistenceError> {
    // 0 en Postgres significa "sin límite"; un deadline vencido ya fue rechazado.
    let millis = millis.max(1).to_string();
    debug!("statement_timeout={millis}ms");
    diesel::sql_query("SELECT set_config('statement_timeout', $1, true)").bind::<Text, _>(millis)
                                                                        .execute(tx)?;
    Ok(())
}

/// Construye un pool r2d2 y aplica migraciones pendientes.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = if min_size == 0 { 1 } else { min_size };
    let validated_max = if max_size == 0 { 1 } else { max_size };
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración (DATABASE_URL,
/// tamaños) y construye un pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
