use async_trait::async_trait;
use chrono::NaiveDate;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    error::QueryError,
    model::{ResolvedLocation, Temperature, WeatherReport, Wind},
};

use super::WeatherProvider;

/// In-memory provider: a fixed gazetteer plus canned weather.
#[derive(Debug)]
pub(crate) struct FakeProvider {
    places: HashMap<String, Vec<ResolvedLocation>>,
    current: Result<WeatherReport, QueryError>,
    forecast: Result<Vec<WeatherReport>, QueryError>,
    failure: Option<QueryError>,
    geocode_calls: Mutex<Vec<String>>,
    weather_calls: AtomicUsize,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self {
            places: HashMap::new(),
            current: Ok(sample_current()),
            forecast: Ok(sample_forecast()),
            failure: None,
            geocode_calls: Mutex::new(Vec::new()),
            weather_calls: AtomicUsize::new(0),
        }
    }

    /// Beijing and Shanghai, as AMap names them.
    pub(crate) fn with_cities() -> Self {
        Self::new()
            .with_place("北京", vec![location("110000", "北京市")])
            .with_place("上海", vec![location("310000", "上海市")])
    }

    pub(crate) fn with_place(mut self, address: &str, candidates: Vec<ResolvedLocation>) -> Self {
        self.places.insert(address.to_string(), candidates);
        self
    }

    pub(crate) fn with_current(mut self, current: Result<WeatherReport, QueryError>) -> Self {
        self.current = current;
        self
    }

    pub(crate) fn with_forecast(mut self, forecast: Result<Vec<WeatherReport>, QueryError>) -> Self {
        self.forecast = forecast;
        self
    }

    /// Every call, geocoding included, fails with `err`.
    pub(crate) fn failing(mut self, err: QueryError) -> Self {
        self.failure = Some(err);
        self
    }

    pub(crate) fn geocode_calls(&self) -> Vec<String> {
        self.geocode_calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub(crate) fn weather_calls(&self) -> usize {
        self.weather_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for FakeProvider {
    async fn geocode(&self, address: &str) -> Result<Vec<ResolvedLocation>, QueryError> {
        if let Ok(mut calls) = self.geocode_calls.lock() {
            calls.push(address.to_string());
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.places.get(address).cloned().unwrap_or_default())
    }

    async fn current(&self, _location: &ResolvedLocation) -> Result<WeatherReport, QueryError> {
        self.weather_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.current.clone()
    }

    async fn forecast(
        &self,
        _location: &ResolvedLocation,
    ) -> Result<Vec<WeatherReport>, QueryError> {
        self.weather_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.forecast.clone()
    }
}

pub(crate) fn location(adcode: &str, name: &str) -> ResolvedLocation {
    ResolvedLocation { adcode: adcode.to_string(), name: name.to_string(), coordinates: None }
}

pub(crate) fn sample_current() -> WeatherReport {
    WeatherReport {
        date: None,
        observed_at: NaiveDate::from_ymd_opt(2026, 10, 19).and_then(|d| d.and_hms_opt(11, 30, 0)),
        condition: "晴".to_string(),
        night_condition: None,
        temperature: Temperature::Current(18.0),
        wind: Wind::new(Some("东北".to_string()), Some("≤3".to_string())),
        humidity_pct: Some(45),
    }
}

pub(crate) fn forecast_day(day: u32, condition: &str, low: f64, high: f64) -> WeatherReport {
    WeatherReport {
        date: NaiveDate::from_ymd_opt(2026, 10, day),
        observed_at: None,
        condition: condition.to_string(),
        night_condition: None,
        temperature: Temperature::Range { low, high },
        wind: None,
        humidity_pct: None,
    }
}

/// Four days starting Monday 2026-10-19, the way AMap returns them.
pub(crate) fn sample_forecast() -> Vec<WeatherReport> {
    vec![
        forecast_day(19, "多云", 14.0, 21.0),
        forecast_day(20, "晴", 13.0, 23.0),
        forecast_day(21, "小雨", 12.0, 17.0),
        forecast_day(22, "阴", 11.0, 16.0),
    ]
}
