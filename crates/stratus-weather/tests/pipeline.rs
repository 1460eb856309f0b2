//! End-to-end pipeline tests against mock HTTP upstreams.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{reading, HttpProvider};
use std::sync::Arc;
use stratus_core::{Config, FallbackErrorPolicy};
use stratus_weather::{
    BreakerState, ErrorKind, ManualClock, Pipeline, RecordingMetrics, RequestContext,
    WeatherError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> Config {
    let mut config = Config::default();
    config.breaker.max_fails = 2;
    config.breaker.attempts_to_recover = 1;
    config.breaker.timeout_secs = 60;
    config
}

#[tokio::test]
async fn test_outage_fails_over_and_trips_breaker() -> anyhow::Result<()> {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    // The primary must be called exactly twice: after that its breaker is open.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&primary)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reading(4.0, 90.0, "Drizzle")))
        .expect(3)
        .mount(&secondary)
        .await;

    let metrics = Arc::new(RecordingMetrics::new());
    let pipeline = Pipeline::builder(config())
        .provider(HttpProvider::new("primary", &primary.uri()))
        .provider(HttpProvider::new("secondary", &secondary.uri()))
        .metrics(metrics.clone())
        .build()?;
    let ctx = RequestContext::new();

    for city in ["Dublin", "Cork", "Galway"] {
        let weather = pipeline.get_current(&ctx, city).await?;
        assert_eq!(weather.description(), "Drizzle");
    }

    // Cached: no upstream traffic.
    pipeline.get_current(&ctx, "Dublin").await?;

    assert_eq!(pipeline.breaker("primary").map(|b| b.state()), Some(BreakerState::Open));
    assert_eq!(pipeline.breaker("secondary").map(|b| b.state()), Some(BreakerState::Closed));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.cache_hits, 1);
    assert_eq!(snapshot.cache_misses, 3);
    assert_eq!(snapshot.provider("primary").errors, 2);
    Ok(())
}

#[tokio::test]
async fn test_unknown_city_does_not_trip_breaker() -> anyhow::Result<()> {
    let upstream = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/current/Atlantis"))
        .respond_with(ResponseTemplate::new(404))
        .expect(5)
        .mount(&upstream)
        .await;

    let pipeline = Pipeline::builder(config())
        .provider(HttpProvider::new("only", &upstream.uri()))
        .build()?;
    let ctx = RequestContext::new();

    for _ in 0..5 {
        let err = pipeline
            .get_current(&ctx, "Atlantis")
            .await
            .expect_err("unknown city should fail");
        assert_eq!(err.kind(), ErrorKind::CityNotFound);
        assert_eq!(err.kind().http_status(), 404);
    }

    assert_eq!(pipeline.breaker("only").map(|b| b.state()), Some(BreakerState::Closed));
    Ok(())
}

#[tokio::test]
async fn test_breaker_recovers_after_timeout() -> anyhow::Result<()> {
    let upstream = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&upstream)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reading(30.0, 20.0, "Clear")))
        .mount(&upstream)
        .await;

    let clock = Arc::new(ManualClock::default());
    let pipeline = Pipeline::builder(config())
        .provider(HttpProvider::new("only", &upstream.uri()))
        .clock(clock.clone())
        .build()?;
    let ctx = RequestContext::new();

    for city in ["Madrid", "Seville"] {
        let err = pipeline.get_current(&ctx, city).await.expect_err("upstream is down");
        assert_eq!(err.kind(), ErrorKind::WeatherUnavailable);
    }

    let err = pipeline.get_current(&ctx, "Valencia").await.expect_err("breaker is open");
    assert_eq!(err.kind(), ErrorKind::ProviderUnreliable);

    clock.advance(std::time::Duration::from_secs(61));
    let weather = pipeline.get_current(&ctx, "Valencia").await?;
    assert_eq!(weather.description(), "Clear");
    assert_eq!(pipeline.breaker("only").map(|b| b.state()), Some(BreakerState::Closed));
    Ok(())
}

#[tokio::test]
async fn test_aggregate_policy_reports_every_provider() -> anyhow::Result<()> {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&first)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&second)
        .await;

    let mut config = config();
    config.fallback.error_policy = FallbackErrorPolicy::Aggregate;
    let pipeline = Pipeline::builder(config)
        .provider(HttpProvider::new("first", &first.uri()))
        .provider(HttpProvider::new("second", &second.uri()))
        .build()?;

    let err = pipeline
        .get_current(&RequestContext::new(), "Lima")
        .await
        .expect_err("both upstreams fail");

    match &err {
        WeatherError::Exhausted { failures } => {
            let providers: Vec<_> = failures.iter().filter_map(|f| f.provider()).collect();
            assert_eq!(providers, vec!["first", "second"]);
            assert_eq!(failures[0].kind(), ErrorKind::WeatherUnavailable);
        }
        other => anyhow::bail!("expected an aggregated error, got {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::Internal);
    Ok(())
}
