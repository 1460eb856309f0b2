//! Outcome logging around a raw provider.
//!
//! Sits directly on the upstream client, inside the breaker guard, so calls
//! the breaker rejects never show up as provider outcomes.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::context::RequestContext;
use crate::error::WeatherError;
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::provider::WeatherProvider;
use crate::types::Weather;

pub struct Logged<P> {
    inner: P,
    metrics: Arc<dyn MetricsSink>,
}

impl<P: WeatherProvider> Logged<P> {
    /// Log outcomes and report request/error/duration metrics to `metrics`.
    pub fn new(inner: P, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { inner, metrics }
    }

    pub fn without_metrics(inner: P) -> Self {
        Self::new(inner, Arc::new(NoopMetrics))
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: WeatherProvider> WeatherProvider for Logged<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_current(
        &self,
        ctx: &RequestContext,
        city: &str,
    ) -> Result<Weather, WeatherError> {
        let provider = self.inner.name();
        self.metrics.request(provider);
        let started = Instant::now();

        let result = self.inner.get_current(ctx, city).await;

        let elapsed = started.elapsed();
        self.metrics.request_duration(provider, elapsed.as_secs_f64());

        match &result {
            Ok(weather) => tracing::info!(
                provider,
                city,
                temperature = weather.temperature(),
                humidity = weather.humidity(),
                description = weather.description(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Provider returned weather"
            ),
            Err(e) => {
                self.metrics.error(provider);
                tracing::warn!(
                    provider,
                    city,
                    kind = %e.kind(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Provider lookup failed: {}",
                    e
                );
            }
        }

        result
    }
}
