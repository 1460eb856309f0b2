//! A minimal HTTP provider adapter used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use stratus_weather::http::{decode_json, ReqwestErrorExt};
use stratus_weather::{RequestContext, Weather, WeatherError, WeatherProvider};

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    temp_c: f64,
    humidity: f64,
    summary: String,
}

pub struct HttpProvider {
    name: String,
    base_url: String,
    client: Client,
}

impl HttpProvider {
    pub fn new(name: &str, base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            client,
        }
    }
}

#[async_trait]
impl WeatherProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_current(
        &self,
        ctx: &RequestContext,
        city: &str,
    ) -> Result<Weather, WeatherError> {
        let url = format!("{}/current/{}", self.base_url, city);
        let mut request = self.client.get(&url);
        if let Some(remaining) = ctx.remaining() {
            request = request.timeout(remaining);
        }
        ctx.run(async {
            let response = request
                .send()
                .await
                .map_err(|e| e.into_weather_error(city))?;
            let body: CurrentResponse = decode_json(response, city).await?;
            Ok(Weather::new(body.temp_c, body.humidity, body.summary))
        })
        .await
    }
}

pub fn reading(temp_c: f64, humidity: f64, summary: &str) -> serde_json::Value {
    serde_json::json!({
        "temp_c": temp_c,
        "humidity": humidity,
        "summary": summary,
    })
}
