//! Per-provider circuit breaker.
//!
//! # States
//! - Closed: calls pass through, failures are counted
//! - Open: calls are rejected until the timeout has passed since the trip
//! - HalfOpen: calls pass through, a run of successes closes the breaker
//!
//! # Transitions
//! ```text
//! Closed   -> Open:     fail_count >= max_fails (streak older than timeout is dropped)
//! Open     -> HalfOpen: timeout elapsed since last failure
//! HalfOpen -> Closed:   attempts_to_recover consecutive successes
//! HalfOpen -> Open:     any failure
//! ```
//!
//! There is no background timer. Every public method re-evaluates the state
//! under the lock before acting, so a breaker with no traffic simply stays
//! where it is until somebody asks.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use stratus_core::BreakerConfig;

use crate::clock::{elapsed_between, Clock, SystemClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    HalfOpen,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// How long a trip lasts, and how long a failure streak stays relevant
    pub timeout: Duration,
    /// Consecutive failures that trip a closed breaker
    pub max_fails: u32,
    /// Consecutive successes a half-open breaker needs to close
    pub attempts_to_recover: u32,
}

impl BreakerSettings {
    pub fn new(timeout: Duration, max_fails: u32, attempts_to_recover: u32) -> Self {
        Self {
            timeout,
            max_fails,
            attempts_to_recover,
        }
    }
}

impl From<&BreakerConfig> for BreakerSettings {
    fn from(config: &BreakerConfig) -> Self {
        Self::new(config.timeout(), config.max_fails, config.attempts_to_recover)
    }
}

/// Read-only view of a breaker, for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub fail_count: u32,
    pub recover_count: u32,
    pub last_fail_time: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    fail_count: u32,
    recover_count: u32,
    last_fail_time: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a closed breaker on the system clock.
    ///
    /// `max_fails` and `attempts_to_recover` below 1 are treated as 1.
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        Self::with_clock(name, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        name: impl Into<String>,
        settings: BreakerSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let settings = BreakerSettings {
            max_fails: settings.max_fails.max(1),
            attempts_to_recover: settings.attempts_to_recover.max(1),
            ..settings
        };

        Self {
            name: name.into(),
            settings,
            clock,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                fail_count: 0,
                recover_count: 0,
                last_fail_time: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> BreakerSettings {
        self.settings
    }

    /// Whether a call may go through. True unless the breaker is open.
    pub fn allowed(&self) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.evaluate(&mut inner, now);
        inner.state != BreakerState::Open
    }

    /// Record a failed call.
    pub fn fail(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.evaluate(&mut inner, now);

        match inner.state {
            BreakerState::Closed => {
                inner.fail_count += 1;
                inner.last_fail_time = Some(now);
                tracing::debug!(
                    breaker = %self.name,
                    fail_count = inner.fail_count,
                    max_fails = self.settings.max_fails,
                    "Recorded failure"
                );
                self.evaluate(&mut inner, now);
            }
            BreakerState::HalfOpen => {
                inner.last_fail_time = Some(now);
                inner.recover_count = 0;
                self.transition(&mut inner, BreakerState::Open);
            }
            // Late report from a call admitted before the trip.
            BreakerState::Open => {}
        }
    }

    /// Record a successful call. Only counts towards recovery while half-open.
    pub fn success(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.evaluate(&mut inner, now);

        if inner.state == BreakerState::HalfOpen {
            inner.recover_count += 1;
            tracing::debug!(
                breaker = %self.name,
                recover_count = inner.recover_count,
                attempts_to_recover = self.settings.attempts_to_recover,
                "Recorded recovery success"
            );
            self.evaluate(&mut inner, now);
        }
    }

    pub fn state(&self) -> BreakerState {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.evaluate(&mut inner, now);
        inner.state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.evaluate(&mut inner, now);
        BreakerSnapshot {
            state: inner.state,
            fail_count: inner.fail_count,
            recover_count: inner.recover_count,
            last_fail_time: inner.last_fail_time,
        }
    }

    /// Apply any transition that is due at `now`. Caller holds the lock.
    fn evaluate(&self, inner: &mut Inner, now: DateTime<Utc>) {
        match inner.state {
            BreakerState::Closed => {
                if inner.fail_count > 0 && self.timed_out(inner, now) {
                    tracing::debug!(breaker = %self.name, "Failure streak expired");
                    inner.fail_count = 0;
                }
                if inner.fail_count >= self.settings.max_fails {
                    inner.fail_count = 0;
                    inner.recover_count = 0;
                    self.transition(inner, BreakerState::Open);
                }
            }
            BreakerState::Open => {
                if self.open_elapsed(inner, now) {
                    inner.recover_count = 0;
                    self.transition(inner, BreakerState::HalfOpen);
                }
            }
            BreakerState::HalfOpen => {
                if inner.recover_count >= self.settings.attempts_to_recover {
                    inner.fail_count = 0;
                    inner.recover_count = 0;
                    self.transition(inner, BreakerState::Closed);
                }
            }
        }
    }

    /// Last failure is strictly older than the timeout.
    fn timed_out(&self, inner: &Inner, now: DateTime<Utc>) -> bool {
        inner
            .last_fail_time
            .map_or(true, |last| elapsed_between(last, now) > self.settings.timeout)
    }

    /// The open period has lasted at least the timeout.
    fn open_elapsed(&self, inner: &Inner, now: DateTime<Utc>) -> bool {
        inner
            .last_fail_time
            .map_or(true, |last| elapsed_between(last, now) >= self.settings.timeout)
    }

    fn transition(&self, inner: &mut Inner, to: BreakerState) {
        let from = inner.state;
        inner.state = to;
        match to {
            BreakerState::Open => tracing::warn!(
                breaker = %self.name,
                ?from,
                timeout_secs = self.settings.timeout.as_secs(),
                "Circuit breaker opened"
            ),
            BreakerState::HalfOpen => {
                tracing::info!(breaker = %self.name, ?from, "Circuit breaker half-open, probing")
            }
            BreakerState::Closed => {
                tracing::info!(breaker = %self.name, ?from, "Circuit breaker closed")
            }
        }
    }
}
