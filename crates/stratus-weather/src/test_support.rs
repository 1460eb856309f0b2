//! Scripted providers for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use stratus_core::ErrorKind;

use crate::context::RequestContext;
use crate::error::WeatherError;
use crate::provider::WeatherProvider;
use crate::types::Weather;

#[derive(Debug, Clone)]
pub enum Reply {
    Weather(Weather),
    Fail(ErrorKind),
}

impl Reply {
    pub fn rain() -> Self {
        Self::Weather(Weather::new(10.0, 80.0, "Rain"))
    }

    fn into_result(self, provider: &str, city: &str) -> Result<Weather, WeatherError> {
        match self {
            Self::Weather(weather) => Ok(weather),
            Self::Fail(ErrorKind::CityNotFound) => Err(WeatherError::city_not_found(city)),
            Self::Fail(ErrorKind::WeatherUnavailable) => {
                Err(WeatherError::unavailable(format!("{} is down", provider)))
            }
            Self::Fail(ErrorKind::ProviderUnreliable) => {
                Err(WeatherError::provider_unreliable(provider))
            }
            Self::Fail(ErrorKind::Internal) => Err(WeatherError::internal("bad payload")),
        }
    }
}

/// Answers from a script; the last reply repeats once the script runs out.
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &str, reply: Reply) -> Self {
        Self::script(name, vec![reply])
    }

    pub fn script(name: &str, replies: Vec<Reply>) -> Self {
        Self {
            name: name.to_string(),
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> Reply {
        let mut replies = self.replies.lock();
        if replies.len() > 1 {
            replies.pop_front().unwrap_or(Reply::Fail(ErrorKind::Internal))
        } else {
            replies.front().cloned().unwrap_or(Reply::Fail(ErrorKind::Internal))
        }
    }
}

#[async_trait]
impl WeatherProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_current(
        &self,
        _ctx: &RequestContext,
        city: &str,
    ) -> Result<Weather, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.next_reply().into_result(&self.name, city)
    }
}
