use serde::{Deserialize, Serialize};

/// Current conditions for one city, as reported by a provider or the cache.
///
/// Built once and never mutated; fields are read-only through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    temperature: f64,
    humidity: f64,
    description: String,
}

impl Weather {
    pub fn new(temperature: f64, humidity: f64, description: impl Into<String>) -> Self {
        Self {
            temperature,
            humidity,
            description: description.into(),
        }
    }

    /// Temperature in degrees Celsius
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Relative humidity in percent
    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}
