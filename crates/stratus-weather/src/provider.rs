use async_trait::async_trait;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::WeatherError;
use crate::types::Weather;

/// Anything that can report current weather for a city.
///
/// Raw upstream clients implement this, and so does every decorator in this
/// crate, which is what lets them stack. Implementations must map their
/// failures onto the domain error kinds: transport problems and bad statuses
/// to `Unavailable`, undecodable payloads to `Internal`, and an upstream
/// "location not found" to `CityNotFound`.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Short name used in logs, metrics and chain errors
    fn name(&self) -> &str;

    async fn get_current(&self, ctx: &RequestContext, city: &str)
        -> Result<Weather, WeatherError>;
}

#[async_trait]
impl<P: WeatherProvider + ?Sized> WeatherProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn get_current(
        &self,
        ctx: &RequestContext,
        city: &str,
    ) -> Result<Weather, WeatherError> {
        (**self).get_current(ctx, city).await
    }
}
