//! Weather lookup errors.
//!
//! Every variant maps onto one [`ErrorKind`]. Wrapping variants (`Fallback`,
//! `Exhausted`) add context about where a failure happened but always report
//! the kind of the error they wrap.

use stratus_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Weather unavailable: {0}")]
    Unavailable(String),

    #[error("Provider {provider} is unreliable, circuit open")]
    ProviderUnreliable { provider: String },

    #[error("Internal error: {0}")]
    Internal(String),

    /// A provider failure as seen from a fallback chain.
    #[error("Provider {provider} failed on attempt {attempt}: {source}")]
    Fallback {
        attempt: usize,
        provider: String,
        #[source]
        source: Box<WeatherError>,
    },

    /// Every provider of a chain failed. Holds the failures in attempt order.
    #[error("All {} providers failed: {}", .failures.len(), join_failures(.failures))]
    Exhausted { failures: Vec<WeatherError> },
}

fn join_failures(failures: &[WeatherError]) -> String {
    failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl WeatherError {
    pub fn city_not_found(city: impl Into<String>) -> Self {
        Self::CityNotFound(city.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn provider_unreliable(provider: impl Into<String>) -> Self {
        Self::ProviderUnreliable {
            provider: provider.into(),
        }
    }

    /// The flat domain kind of this error, looking through wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CityNotFound(_) => ErrorKind::CityNotFound,
            Self::Unavailable(_) => ErrorKind::WeatherUnavailable,
            Self::ProviderUnreliable { .. } => ErrorKind::ProviderUnreliable,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Fallback { source, .. } => source.kind(),
            Self::Exhausted { failures } => failures
                .last()
                .map_or(ErrorKind::Internal, WeatherError::kind),
        }
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// Name of the provider the failure is attributed to, if a chain wrapped it.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderUnreliable { provider } => Some(provider.as_str()),
            Self::Fallback { provider, .. } => Some(provider.as_str()),
            Self::Exhausted { failures } => failures.last().and_then(WeatherError::provider),
            _ => None,
        }
    }

    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}

/// Cache backend errors. Any of them reads as a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("No cached entry for {0}")]
    Miss(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache backend error: {0}")]
    Backend(String),
}
