//! Circuit breaker guard around a provider.

use async_trait::async_trait;
use std::sync::Arc;

use crate::breaker::CircuitBreaker;
use crate::context::RequestContext;
use crate::error::WeatherError;
use crate::provider::WeatherProvider;
use crate::types::Weather;

/// Skips the inner provider while its breaker is open and feeds call
/// outcomes back into the breaker.
///
/// Only `Unavailable` failures count against the breaker. A city the
/// provider doesn't know is a healthy round-trip, and `Internal` errors are
/// bugs, not provider health.
pub struct Guarded<P> {
    inner: P,
    breaker: Arc<CircuitBreaker>,
}

impl<P: WeatherProvider> Guarded<P> {
    pub fn new(inner: P, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: WeatherProvider> WeatherProvider for Guarded<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_current(
        &self,
        ctx: &RequestContext,
        city: &str,
    ) -> Result<Weather, WeatherError> {
        if !self.breaker.allowed() {
            tracing::debug!(provider = self.inner.name(), city, "Breaker open, skipping provider");
            return Err(WeatherError::provider_unreliable(self.inner.name()));
        }

        match self.inner.get_current(ctx, city).await {
            Ok(weather) => {
                self.breaker.success();
                Ok(weather)
            }
            Err(e) => {
                if e.kind().trips_breaker() {
                    self.breaker.fail();
                }
                Err(e)
            }
        }
    }
}
