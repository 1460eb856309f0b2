//! Helpers for provider adapters that talk HTTP.
//!
//! Upstream clients are thin, but they all have to translate transport
//! faults into the domain error kinds the same way:
//!
//! - 404 means the provider doesn't know the city (`CityNotFound`)
//! - other non-2xx statuses, timeouts and connection failures mean the
//!   provider is unhealthy (`Unavailable`), including rejected credentials
//!   and rate limits
//! - a body that doesn't decode is a bug or a contract change (`Internal`)

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::WeatherError;

/// Map a response status onto the taxonomy. `None` for success codes.
pub fn classify_status(status: StatusCode, city: &str) -> Option<WeatherError> {
    if status.is_success() {
        return None;
    }

    let error = match status {
        StatusCode::NOT_FOUND => WeatherError::city_not_found(city),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            WeatherError::unavailable(format!("credentials rejected ({})", status))
        }
        StatusCode::TOO_MANY_REQUESTS => WeatherError::unavailable("rate limited (429)"),
        _ if status.is_server_error() => {
            WeatherError::unavailable(format!("server error ({})", status))
        }
        _ => WeatherError::unavailable(format!("unexpected status ({})", status)),
    };
    Some(error)
}

/// Extension trait for converting reqwest errors to weather errors.
pub trait ReqwestErrorExt {
    fn into_weather_error(self, city: &str) -> WeatherError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_weather_error(self, city: &str) -> WeatherError {
        if self.is_decode() {
            WeatherError::internal(format!("failed to decode response: {}", self))
        } else if self.is_timeout() {
            WeatherError::unavailable("request timed out")
        } else if self.is_connect() {
            WeatherError::unavailable(format!("connection failed: {}", self))
        } else if let Some(error) = self.status().and_then(|s| classify_status(s, city)) {
            error
        } else {
            WeatherError::unavailable(self.to_string())
        }
    }
}

/// Pass successful responses through, classify the rest.
///
/// # Errors
/// The classified status error for any non-2xx response.
pub fn check_response(response: Response, city: &str) -> Result<Response, WeatherError> {
    match classify_status(response.status(), city) {
        None => Ok(response),
        Some(error) => {
            tracing::debug!(status = %response.status(), url = %response.url(), "Upstream rejected request");
            Err(error)
        }
    }
}

/// Check the status, then decode the JSON body.
///
/// # Errors
/// Status errors from [`check_response`], `Internal` if the body doesn't decode.
pub async fn decode_json<T: DeserializeOwned>(
    response: Response,
    city: &str,
) -> Result<T, WeatherError> {
    check_response(response, city)?
        .json::<T>()
        .await
        .map_err(|e| e.into_weather_error(city))
}
