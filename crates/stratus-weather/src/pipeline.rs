//! Composition root for the resilience pipeline.
//!
//! ```text
//! Cached
//!   └─ FallbackChain
//!        ├─ Guarded(Logged(provider 1))
//!        ├─ Guarded(Logged(provider 2))
//!        └─ ...
//! ```

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use stratus_core::Config;

use crate::breaker::{BreakerSettings, BreakerSnapshot, CircuitBreaker};
use crate::cache::{CacheBackend, MemoryCache};
use crate::cached::Cached;
use crate::chain::FallbackChain;
use crate::clock::{Clock, SystemClock};
use crate::context::RequestContext;
use crate::error::WeatherError;
use crate::guarded::Guarded;
use crate::logged::Logged;
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::provider::WeatherProvider;
use crate::types::Weather;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No weather providers registered")]
    NoProviders,

    #[error("Duplicate provider name: {0}")]
    DuplicateProvider(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub struct PipelineBuilder {
    config: Config,
    providers: Vec<Arc<dyn WeatherProvider>>,
    metrics: Arc<dyn MetricsSink>,
    cache: Option<Arc<dyn CacheBackend>>,
    clock: Arc<dyn Clock>,
}

impl PipelineBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            providers: Vec::new(),
            metrics: Arc::new(NoopMetrics),
            cache: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Register a raw upstream client. Registration order is priority order.
    pub fn provider(mut self, provider: impl WeatherProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn shared_provider(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Sink for cache and provider metrics. Pass
    /// [`crate::RecorderMetrics`] to report through an installed exporter.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Use an external cache backend instead of the in-memory one.
    pub fn cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Clock for the circuit breakers.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// # Errors
    /// Invalid configuration, no providers, or two providers with one name.
    pub fn build(self) -> Result<Pipeline, BuildError> {
        let validation = self.config.validate();
        if !validation.is_valid() {
            return Err(BuildError::InvalidConfig(validation.error_summary()));
        }
        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        if self.providers.is_empty() {
            return Err(BuildError::NoProviders);
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name().to_string()) {
                return Err(BuildError::DuplicateProvider(provider.name().to_string()));
            }
        }

        let settings = BreakerSettings::from(&self.config.breaker);
        let mut breakers = Vec::with_capacity(self.providers.len());
        let mut guarded: Vec<Arc<dyn WeatherProvider>> = Vec::with_capacity(self.providers.len());

        for provider in self.providers {
            let name = provider.name().to_string();
            let breaker = Arc::new(CircuitBreaker::with_clock(
                name.clone(),
                settings,
                self.clock.clone(),
            ));
            let logged = Logged::new(provider, self.metrics.clone());
            guarded.push(Arc::new(Guarded::new(logged, breaker.clone())));
            breakers.push((name, breaker));
        }

        let chain = FallbackChain::new(guarded).with_error_policy(self.config.fallback.error_policy);

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::from_config(&self.config.cache)));

        let root = Cached::new(chain, cache, self.metrics)
            .with_write_policy(self.config.cache.write_failure);

        tracing::info!(
            providers = ?breakers.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
            "Weather pipeline ready"
        );

        Ok(Pipeline { root, breakers })
    }
}

/// Health of one provider, as seen by its breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderHealth {
    pub provider: String,
    #[serde(flatten)]
    pub breaker: BreakerSnapshot,
}

/// The assembled pipeline. This is what HTTP/RPC handlers call.
pub struct Pipeline {
    root: Cached<FallbackChain>,
    breakers: Vec<(String, Arc<CircuitBreaker>)>,
}

impl Pipeline {
    pub fn builder(config: Config) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Current weather for `city`, from cache or the first healthy provider.
    ///
    /// # Errors
    /// The chain's error when no provider could answer; map
    /// [`WeatherError::kind`] to a transport status.
    #[instrument(skip(self, ctx), level = "info")]
    pub async fn get_current(
        &self,
        ctx: &RequestContext,
        city: &str,
    ) -> Result<Weather, WeatherError> {
        self.root.get_current(ctx, city).await
    }

    /// Breaker state per provider, in priority order.
    pub fn provider_health(&self) -> Vec<ProviderHealth> {
        self.breakers
            .iter()
            .map(|(name, breaker)| ProviderHealth {
                provider: name.clone(),
                breaker: breaker.snapshot(),
            })
            .collect()
    }

    pub fn breaker(&self, provider: &str) -> Option<&Arc<CircuitBreaker>> {
        self.breakers
            .iter()
            .find(|(name, _)| name == provider)
            .map(|(_, breaker)| breaker)
    }
}

#[async_trait]
impl WeatherProvider for Pipeline {
    fn name(&self) -> &str {
        "pipeline"
    }

    async fn get_current(
        &self,
        ctx: &RequestContext,
        city: &str,
    ) -> Result<Weather, WeatherError> {
        Pipeline::get_current(self, ctx, city).await
    }
}
