//! Ordered fallback across providers.

use async_trait::async_trait;
use std::sync::Arc;

use stratus_core::FallbackErrorPolicy;

use crate::context::RequestContext;
use crate::error::WeatherError;
use crate::provider::WeatherProvider;
use crate::types::Weather;

/// Tries providers in construction order and returns the first success.
///
/// Strictly sequential: guarded providers with an open breaker fail
/// immediately, so there is nothing to gain from fanning out. Each failure
/// is wrapped in [`WeatherError::Fallback`] with its attempt number and
/// provider name. When everything fails, the [`FallbackErrorPolicy`] picks
/// what the caller sees; the default is the last provider's error.
pub struct FallbackChain {
    providers: Vec<Arc<dyn WeatherProvider>>,
    error_policy: FallbackErrorPolicy,
}

impl FallbackChain {
    pub fn new(providers: Vec<Arc<dyn WeatherProvider>>) -> Self {
        Self {
            providers,
            error_policy: FallbackErrorPolicy::default(),
        }
    }

    pub fn with_error_policy(mut self, policy: FallbackErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in priority order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl WeatherProvider for FallbackChain {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn get_current(
        &self,
        ctx: &RequestContext,
        city: &str,
    ) -> Result<Weather, WeatherError> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for (index, provider) in self.providers.iter().enumerate() {
            // A caller that gave up gets the context error, not a provider's.
            ctx.check()?;

            let attempt = index + 1;
            match provider.get_current(ctx, city).await {
                Ok(weather) => {
                    if attempt > 1 {
                        tracing::info!(
                            provider = provider.name(),
                            city,
                            attempt,
                            "Served by fallback provider"
                        );
                    }
                    return Ok(weather);
                }
                Err(e) => {
                    tracing::debug!(
                        provider = provider.name(),
                        city,
                        attempt,
                        kind = %e.kind(),
                        "Fallback candidate failed"
                    );
                    failures.push(WeatherError::Fallback {
                        attempt,
                        provider: provider.name().to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }

        tracing::warn!(city, attempts = failures.len(), "All weather providers failed");

        match self.error_policy {
            FallbackErrorPolicy::LastError => Err(failures
                .pop()
                .unwrap_or_else(|| WeatherError::internal("No weather providers configured"))),
            FallbackErrorPolicy::Aggregate if failures.is_empty() => {
                Err(WeatherError::internal("No weather providers configured"))
            }
            FallbackErrorPolicy::Aggregate => Err(WeatherError::Exhausted { failures }),
        }
    }
}
