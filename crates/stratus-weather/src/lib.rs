//! Resilient current-weather lookups for Stratus.
//!
//! Upstream providers are wrapped in a logging decorator and a circuit
//! breaker guard, tried in priority order by a fallback chain, and fronted
//! by a read-through TTL cache. [`PipelineBuilder`] assembles the stack.

pub mod breaker;
pub mod cache;
pub mod cached;
pub mod chain;
pub mod clock;
pub mod context;
pub mod error;
pub mod guarded;
pub mod http;
pub mod logged;
pub mod metrics;
pub mod pipeline;
pub mod provider;
pub mod types;

#[cfg(test)]
mod test_support;

pub use breaker::{BreakerSettings, BreakerSnapshot, BreakerState, CircuitBreaker};
pub use cache::{CacheBackend, MemoryCache};
pub use cached::Cached;
pub use chain::FallbackChain;
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::RequestContext;
pub use error::{CacheError, WeatherError};
pub use guarded::Guarded;
pub use logged::Logged;
pub use metrics::{
    MetricsSink, MetricsSnapshot, NoopMetrics, ProviderTally, RecorderMetrics, RecordingMetrics,
};
pub use pipeline::{BuildError, Pipeline, PipelineBuilder, ProviderHealth};
pub use provider::WeatherProvider;
pub use types::Weather;

pub use stratus_core::ErrorKind;
