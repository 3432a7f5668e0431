//! Tokens de acceso para las APIs pull.
//!
//! `CachedTokenSource` es un componente explícito (sin estado global): recibe
//! el reloj por inyección, invalida el token cuando entra en el margen de
//! seguridad previo a su expiración y expone `invalidate()` para cuando el
//! proveedor lo rechaza.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use punch_core::Clock;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::PullError;

/// Margen por defecto antes de la expiración real.
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Construye a partir del `expires_in` (segundos) que devuelven las APIs.
    pub fn expiring_in(token: impl Into<String>, now: DateTime<Utc>, expires_in_secs: i64) -> Self {
        Self { token: token.into(),
               expires_at: now + Duration::seconds(expires_in_secs) }
    }
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn get_token(&self) -> Result<AccessToken, PullError>;

    /// Descarta cualquier token cacheado. No-op para fuentes sin caché.
    async fn invalidate(&self) {}
}

#[async_trait]
impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    async fn get_token(&self) -> Result<AccessToken, PullError> {
        (**self).get_token().await
    }

    async fn invalidate(&self) {
        (**self).invalidate().await
    }
}

pub struct CachedTokenSource<S, C> {
    inner: S,
    clock: C,
    safety_margin: Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl<S: TokenSource, C: Clock> CachedTokenSource<S, C> {
    pub fn new(inner: S, clock: C) -> Self {
        Self { inner,
               clock,
               safety_margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS),
               cached: Mutex::new(None) }
    }

    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    fn is_fresh(&self, token: &AccessToken) -> bool {
        self.clock.now() < token.expires_at - self.safety_margin
    }
}

#[async_trait]
impl<S: TokenSource, C: Clock> TokenSource for CachedTokenSource<S, C> {
    async fn get_token(&self) -> Result<AccessToken, PullError> {
        // El lock se mantiene durante la obtención: una sola petición de token
        // aunque haya varios llamadores concurrentes.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if self.is_fresh(token) {
                return Ok(token.clone());
            }
            debug!("token:expired expires_at={}", token.expires_at);
        }
        let fresh = self.inner.get_token().await?;
        debug!("token:refreshed expires_at={}", fresh.expires_at);
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use punch_core::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        clock: Arc<ManualClock>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn get_token(&self) -> Result<AccessToken, PullError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken::expiring_in(format!("tok-{n}"), self.clock.now(), 7200))
        }
    }

    fn setup() -> (Arc<ManualClock>, CachedTokenSource<Arc<CountingSource>, Arc<ManualClock>>, Arc<CountingSource>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let inner = Arc::new(CountingSource { clock: clock.clone(),
                                              calls: AtomicUsize::new(0) });
        (clock.clone(), CachedTokenSource::new(inner.clone(), clock), inner)
    }

    #[tokio::test]
    async fn reuses_token_until_safety_margin() {
        let (clock, cache, inner) = setup();
        assert_eq!(cache.get_token().await.unwrap().token, "tok-0");
        clock.advance(Duration::seconds(7200 - 301));
        assert_eq!(cache.get_token().await.unwrap().token, "tok-0");
        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get_token().await.unwrap().token, "tok-1");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refresh() {
        let (_clock, cache, inner) = setup();
        cache.get_token().await.unwrap();
        cache.invalidate().await;
        assert_eq!(cache.get_token().await.unwrap().token, "tok-1");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
