use tracing::debug;

use crate::{
    config::MAX_FORECAST_DAYS,
    error::QueryError,
    model::{Mode, ResolvedLocation, Weather},
    provider::WeatherProvider,
};

/// Issues the weather request for an already resolved location.
#[derive(Debug, Clone, Copy)]
pub struct WeatherFetcher<'a> {
    provider: &'a dyn WeatherProvider,
}

impl<'a> WeatherFetcher<'a> {
    pub fn new(provider: &'a dyn WeatherProvider) -> Self {
        Self { provider }
    }

    /// One provider call. Forecasts come back in calendar order, earliest
    /// first, and never longer than a week.
    pub async fn fetch(
        &self,
        location: &ResolvedLocation,
        mode: Mode,
    ) -> Result<Weather, QueryError> {
        debug!("Fetching {} weather for {} ({})", mode, location.name, location.adcode);

        match mode {
            Mode::Current => self.provider.current(location).await.map(Weather::Current),
            Mode::Forecast => {
                let mut reports = self.provider.forecast(location).await?;
                reports.sort_by_key(|r| r.date);
                reports.dedup_by_key(|r| r.date);
                reports.truncate(usize::from(MAX_FORECAST_DAYS));

                debug!("Received {} forecast days for {}", reports.len(), location.name);
                Ok(Weather::Forecast(reports))
            }
        }
    }
}
