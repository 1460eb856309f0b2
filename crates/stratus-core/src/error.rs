//! Domain error kinds shared by the pipeline and the transport layers that
//! sit on top of it.
//!
//! The kind is a flat tag, not a hierarchy: it says *why* a lookup failed so
//! breakers, caches and HTTP/RPC handlers can branch on it without knowing
//! about provider-specific error types.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The provider answered and does not know the city. Not a health signal.
    CityNotFound,
    /// Transport or provider-health fault. The only kind that trips a breaker.
    WeatherUnavailable,
    /// Synthetic: the provider's breaker is open and the call was skipped.
    ProviderUnreliable,
    /// Decode failures and bugs.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CityNotFound => "city_not_found",
            Self::WeatherUnavailable => "weather_unavailable",
            Self::ProviderUnreliable => "provider_unreliable",
            Self::Internal => "internal",
        }
    }

    /// Suggested HTTP status for handlers that expose the pipeline.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::CityNotFound => 404,
            Self::WeatherUnavailable | Self::ProviderUnreliable => 503,
            Self::Internal => 500,
        }
    }

    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::CityNotFound => "City not found. Check the spelling and try again.",
            Self::WeatherUnavailable => "Weather service unavailable. Please try again later.",
            Self::ProviderUnreliable => {
                "Weather providers are temporarily unavailable. Please try again later."
            }
            Self::Internal => "An unexpected error occurred. Please try again.",
        }
    }

    /// Whether a failure of this kind counts against a provider's health.
    pub fn trips_breaker(&self) -> bool {
        matches!(self, Self::WeatherUnavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
