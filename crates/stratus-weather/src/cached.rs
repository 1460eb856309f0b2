//! Read-through cache in front of a provider, usually the fallback chain.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use stratus_core::CacheWritePolicy;

use crate::cache::CacheBackend;
use crate::context::RequestContext;
use crate::error::WeatherError;
use crate::metrics::MetricsSink;
use crate::provider::WeatherProvider;
use crate::types::Weather;

/// Serves cached readings when it can and stores fresh ones on the way out.
///
/// Only successful readings are cached; every error, including
/// `CityNotFound`, passes through untouched so a city that starts resolving
/// later is not shadowed by a stale negative answer.
pub struct Cached<P> {
    inner: P,
    cache: Arc<dyn CacheBackend>,
    metrics: Arc<dyn MetricsSink>,
    write_policy: CacheWritePolicy,
}

impl<P: WeatherProvider> Cached<P> {
    pub fn new(inner: P, cache: Arc<dyn CacheBackend>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            inner,
            cache,
            metrics,
            write_policy: CacheWritePolicy::default(),
        }
    }

    pub fn with_write_policy(mut self, policy: CacheWritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: WeatherProvider> WeatherProvider for Cached<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_current(
        &self,
        ctx: &RequestContext,
        city: &str,
    ) -> Result<Weather, WeatherError> {
        let started = Instant::now();
        let cached = self.cache.get(ctx, city).await;
        let latency = started.elapsed().as_secs_f64();

        match cached {
            Ok(weather) => {
                self.metrics.cache_hit();
                self.metrics.cache_access_latency(latency);
                tracing::debug!(city, "Weather cache hit");
                return Ok(weather);
            }
            Err(e) => {
                self.metrics.cache_miss();
                self.metrics.cache_access_latency(latency);
                tracing::debug!(city, reason = %e, "Weather cache miss");
            }
        }

        let weather = self.inner.get_current(ctx, city).await?;

        if let Err(e) = self.cache.set(ctx, city, &weather).await {
            match self.write_policy {
                CacheWritePolicy::Ignore => {
                    tracing::warn!(city, "Failed to cache weather: {}", e);
                }
                CacheWritePolicy::Propagate => {
                    tracing::error!(city, "Failed to cache weather: {}", e);
                    return Err(WeatherError::internal(format!(
                        "Failed to cache weather for {}: {}",
                        city, e
                    )));
                }
            }
        }

        Ok(weather)
    }
}
