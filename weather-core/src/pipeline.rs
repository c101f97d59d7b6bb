//! Orchestration of one weather question: parse, resolve, fetch, format.

use chrono::{Days, Duration, NaiveDate, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    config::{Config, DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS},
    error::QueryError,
    fetcher::WeatherFetcher,
    format::format,
    model::Weather,
    provider::{WeatherProvider, amap::AmapProvider},
    query::{LocationQuery, TimeIntent},
    resolver::LocationResolver,
};

/// Where a query currently is; `Failed` is reachable from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parsed,
    Resolving,
    Fetching,
    Formatting,
    Done,
    Failed,
}

/// AMap dates forecast days in China Standard Time.
const PROVIDER_UTC_OFFSET_HOURS: i64 = 8;

/// Answers weather questions against a shared, read-only provider.
#[derive(Debug, Clone)]
pub struct QueryPipeline {
    provider: Arc<dyn WeatherProvider>,
    forecast_days: u8,
    today: Option<NaiveDate>,
}

impl QueryPipeline {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider, forecast_days: DEFAULT_FORECAST_DAYS, today: None }
    }

    /// Pins the date that "今天" refers to instead of reading the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Default number of days for forecast questions that don't name one.
    pub fn with_forecast_days(mut self, days: u8) -> Self {
        self.forecast_days = days.clamp(1, MAX_FORECAST_DAYS);
        self
    }

    /// Pipeline backed by the AMap web service.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = AmapProvider::from_config(config)?;
        Ok(Self::new(Arc::new(provider)).with_forecast_days(config.forecast_days()))
    }

    /// Always yields text: the formatted answer or a short user-safe message.
    pub async fn answer(&self, raw_text: &str) -> String {
        match self.run(raw_text).await {
            Ok(text) => text,
            Err((failed_at, err)) => {
                let stage = Stage::Failed;
                if err.is_operator_facing() {
                    error!(?stage, ?failed_at, error = %err, "Weather query failed, check the API key configuration");
                } else {
                    warn!(?stage, ?failed_at, error = %err, "Weather query failed");
                }
                err.user_message().to_string()
            }
        }
    }

    /// Answers independent questions concurrently; answers keep input order.
    pub async fn answer_many<S: AsRef<str>>(&self, raw_texts: &[S]) -> Vec<String> {
        join_all(raw_texts.iter().map(|raw| self.answer(raw.as_ref()))).await
    }

    async fn run(&self, raw_text: &str) -> Result<String, (Stage, QueryError)> {
        let query = LocationQuery::new(raw_text.trim());
        let place = query.place_name();
        if place.is_empty() {
            return Err((Stage::Parsed, QueryError::NoLocationFound));
        }
        let intent = query.intent();
        debug!(stage = ?Stage::Parsed, place = %place, mode = %intent.mode, "Parsed weather query");

        debug!(stage = ?Stage::Resolving);
        let location = LocationResolver::new(self.provider.as_ref())
            .resolve(&place)
            .await
            .map_err(|e| (Stage::Resolving, e))?;

        debug!(stage = ?Stage::Fetching);
        let weather = WeatherFetcher::new(self.provider.as_ref())
            .fetch(&location, intent.mode)
            .await
            .map_err(|e| (Stage::Fetching, e))?;

        debug!(stage = ?Stage::Formatting);
        let weather = self.window(weather, intent);
        let text = format(&location, &weather);

        info!(stage = ?Stage::Done, location = %location.name, mode = %intent.mode, "Answered weather query");
        Ok(text)
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| {
            (Utc::now() + Duration::hours(PROVIDER_UTC_OFFSET_HOURS)).date_naive()
        })
    }

    /// Narrows a forecast to the days the question asked about, starting at the
    /// first report dated on or after today plus the offset. A target past the
    /// provider's horizon falls back to its last day.
    fn window(&self, weather: Weather, intent: TimeIntent) -> Weather {
        match weather {
            Weather::Current(report) => Weather::Current(report),
            Weather::Forecast(reports) => {
                let today = self.today();
                let target =
                    today.checked_add_days(Days::new(u64::from(intent.offset_days))).unwrap_or(today);

                let last = reports.len().saturating_sub(1);
                let start = reports
                    .iter()
                    .position(|r| r.date.is_some_and(|date| date >= target))
                    .unwrap_or(last);
                let days = usize::from(intent.days.unwrap_or(self.forecast_days));

                Weather::Forecast(reports.into_iter().skip(start).take(days).collect())
            }
        }
    }
}
