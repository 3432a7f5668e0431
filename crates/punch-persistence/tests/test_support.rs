use once_cell::sync::Lazy;
use punch_persistence::config::DbConfig;
use punch_persistence::pg::{build_pool, PgPool};

pub static TEST_POOL: Lazy<Option<PgPool>> = Lazy::new(|| {
    if !DbConfig::is_configured() {
        return None;
    }
    let cfg = match DbConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config de test inválida: {e}");
            return None;
        }
    };
    match build_pool(&cfg.url, 1, 4) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("No se pudo construir pool de test: {e}");
            None
        }
    }
});

pub fn with_pool<F, R>(f: F) -> Option<R>
    where F: FnOnce(&PgPool) -> R
{
    TEST_POOL.as_ref().map(f)
}

/// Tenant único por test para no chocar entre ejecuciones.
pub fn fresh_tenant() -> String {
    format!("t-{}", uuid::Uuid::new_v4())
}
