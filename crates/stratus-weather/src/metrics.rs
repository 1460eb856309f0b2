//! Metrics sink the pipeline reports into.
//!
//! The sink is built once at the composition root and handed to the cache
//! decorator and the provider loggers. Recording never fails a call.
//!
//! # Metrics
//! - `weather_cache_hits_total` (counter)
//! - `weather_cache_misses_total` (counter)
//! - `weather_cache_access_seconds` (histogram)
//! - `weather_provider_requests_total` (counter, `provider` label)
//! - `weather_provider_errors_total` (counter, `provider` label)
//! - `weather_provider_request_duration_seconds` (histogram, `provider` label)

use metrics::{counter, histogram};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub trait MetricsSink: Send + Sync {
    fn cache_hit(&self);
    fn cache_miss(&self);
    fn cache_access_latency(&self, seconds: f64);

    fn request(&self, provider: &str);
    fn error(&self, provider: &str);
    fn request_duration(&self, provider: &str, seconds: f64);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn cache_hit(&self) {}
    fn cache_miss(&self) {}
    fn cache_access_latency(&self, _seconds: f64) {}
    fn request(&self, _provider: &str) {}
    fn error(&self, _provider: &str) {}
    fn request_duration(&self, _provider: &str, _seconds: f64) {}
}

/// Forwards to whatever recorder is installed for the `metrics` facade,
/// e.g. a Prometheus exporter. Without one every call is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderMetrics;

impl MetricsSink for RecorderMetrics {
    fn cache_hit(&self) {
        counter!("weather_cache_hits_total").increment(1);
    }

    fn cache_miss(&self) {
        counter!("weather_cache_misses_total").increment(1);
    }

    fn cache_access_latency(&self, seconds: f64) {
        histogram!("weather_cache_access_seconds").record(seconds);
    }

    fn request(&self, provider: &str) {
        counter!("weather_provider_requests_total", "provider" => provider.to_string())
            .increment(1);
    }

    fn error(&self, provider: &str) {
        counter!("weather_provider_errors_total", "provider" => provider.to_string())
            .increment(1);
    }

    fn request_duration(&self, provider: &str, seconds: f64) {
        histogram!(
            "weather_provider_request_duration_seconds",
            "provider" => provider.to_string()
        )
        .record(seconds);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProviderTally {
    pub requests: u64,
    pub errors: u64,
    pub total_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_latency_samples: u64,
    pub cache_latency_seconds: f64,
    pub providers: BTreeMap<String, ProviderTally>,
}

impl MetricsSnapshot {
    pub fn provider(&self, name: &str) -> ProviderTally {
        self.providers.get(name).copied().unwrap_or_default()
    }
}

/// In-process counters, readable with [`RecordingMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_latency: Mutex<(u64, f64)>,
    providers: Mutex<BTreeMap<String, ProviderTally>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (samples, seconds) = *self.cache_latency.lock();
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_latency_samples: samples,
            cache_latency_seconds: seconds,
            providers: self.providers.lock().clone(),
        }
    }

    fn with_provider(&self, provider: &str, update: impl FnOnce(&mut ProviderTally)) {
        let mut providers = self.providers.lock();
        update(providers.entry(provider.to_string()).or_default());
    }
}

impl MetricsSink for RecordingMetrics {
    fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_access_latency(&self, seconds: f64) {
        let mut latency = self.cache_latency.lock();
        latency.0 += 1;
        latency.1 += seconds;
    }

    fn request(&self, provider: &str) {
        self.with_provider(provider, |tally| tally.requests += 1);
    }

    fn error(&self, provider: &str) {
        self.with_provider(provider, |tally| tally.errors += 1);
    }

    fn request_duration(&self, provider: &str, seconds: f64) {
        self.with_provider(provider, |tally| tally.total_seconds += seconds);
    }
}
