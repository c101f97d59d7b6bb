//! AMap (高德) v3 web service: `geocode/geo` and `weather/weatherInfo`.
//!
//! Every value in AMap payloads is a string, and empty values are sometimes
//! sent as `[]` instead of `""`; all fields are therefore decoded leniently
//! and validated afterwards so that a missing field becomes a typed
//! [`QueryError::MalformedResponse`] instead of a decode failure.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    config::{ApiKey, Config},
    error::QueryError,
    model::{Coordinates, ResolvedLocation, Temperature, WeatherReport, Wind},
};

use super::WeatherProvider;

const GEOCODE_ENDPOINT: &str = "geocode/geo";
const WEATHER_ENDPOINT: &str = "weather/weatherInfo";

/// Infocodes that mean the key itself is unusable (invalid, deleted, wrong
/// platform, IP/domain/signature restrictions, missing privileges).
const CREDENTIAL_INFOCODES: &[&str] =
    &["10001", "10005", "10006", "10007", "10008", "10009", "10012", "10013"];

#[derive(Debug, Clone)]
pub struct AmapProvider {
    api_key: ApiKey,
    base_url: String,
    http: Client,
}

impl AmapProvider {
    pub fn new(api_key: ApiKey, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for AMap")?;

        Ok(Self { api_key, base_url: base_url.trim_end_matches('/').to_string(), http })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(config.api_key.clone(), &config.api_base_url, config.timeout())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, QueryError> {
        if self.api_key.is_blank() {
            return Err(QueryError::InvalidCredential);
        }

        let url = format!("{}/{}", self.base_url, endpoint);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.expose())])
            .query(params)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| transport_error(endpoint, e))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(QueryError::InvalidCredential);
        }

        if !status.is_success() {
            debug!(endpoint, %status, body = %truncate_body(&body), "AMap returned an error status");
            return Err(QueryError::unavailable(format!("{endpoint} returned HTTP {status}")));
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(endpoint, error = %e, "Failed to parse AMap JSON");
            QueryError::malformed(Vec::<String>::new())
        })
    }

    async fn weather_info(
        &self,
        location: &ResolvedLocation,
        extensions: &str,
    ) -> Result<WeatherInfoResponse, QueryError> {
        let parsed: WeatherInfoResponse = self
            .get(WEATHER_ENDPOINT, &[("city", location.adcode.as_str()), ("extensions", extensions)])
            .await?;
        parsed.envelope.check(WEATHER_ENDPOINT)?;
        Ok(parsed)
    }
}

#[async_trait]
impl WeatherProvider for AmapProvider {
    async fn geocode(&self, address: &str) -> Result<Vec<ResolvedLocation>, QueryError> {
        let parsed: GeocodeResponse = self.get(GEOCODE_ENDPOINT, &[("address", address)]).await?;
        parsed.envelope.check(GEOCODE_ENDPOINT)?;
        parsed.into_locations()
    }

    async fn current(&self, location: &ResolvedLocation) -> Result<WeatherReport, QueryError> {
        self.weather_info(location, "base").await?.into_current()
    }

    async fn forecast(
        &self,
        location: &ResolvedLocation,
    ) -> Result<Vec<WeatherReport>, QueryError> {
        self.weather_info(location, "all").await?.into_forecast()
    }
}

/// `status`/`info`/`infocode` triple present on every AMap response.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "lenient")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    info: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    infocode: Option<String>,
}

impl Envelope {
    fn check(&self, endpoint: &str) -> Result<(), QueryError> {
        match self.status.as_deref() {
            Some("1") => Ok(()),
            Some(_) => {
                let code = self.infocode.as_deref().unwrap_or("unknown");
                let info = self.info.as_deref().unwrap_or("");

                if CREDENTIAL_INFOCODES.contains(&code) {
                    Err(QueryError::InvalidCredential)
                } else {
                    Err(QueryError::unavailable(format!("{endpoint} failed with {code} {info}")))
                }
            }
            None => Err(QueryError::malformed(["status"])),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(flatten)]
    envelope: Envelope,
    #[serde(default)]
    geocodes: Vec<Geocode>,
}

#[derive(Debug, Deserialize)]
struct Geocode {
    #[serde(default, deserialize_with = "lenient")]
    formatted_address: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    province: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    city: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    district: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    adcode: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    location: Option<String>,
}

impl GeocodeResponse {
    /// Keeps provider order; candidates without an adcode cannot be queried and are dropped.
    fn into_locations(self) -> Result<Vec<ResolvedLocation>, QueryError> {
        let total = self.geocodes.len();

        let locations: Vec<ResolvedLocation> =
            self.geocodes.into_iter().filter_map(Geocode::into_location).collect();

        if total > 0 && locations.is_empty() {
            return Err(QueryError::malformed(["geocodes[0].adcode"]));
        }

        Ok(locations)
    }
}

impl Geocode {
    fn into_location(self) -> Option<ResolvedLocation> {
        let adcode = self.adcode?;

        let name = self.formatted_address.unwrap_or_else(|| {
            let mut parts: Vec<String> = Vec::new();
            for part in [self.province, self.city, self.district].into_iter().flatten() {
                if !parts.contains(&part) {
                    parts.push(part);
                }
            }
            parts.concat()
        });

        Some(ResolvedLocation {
            adcode,
            name,
            coordinates: self.location.as_deref().and_then(Coordinates::parse),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WeatherInfoResponse {
    #[serde(flatten)]
    envelope: Envelope,
    #[serde(default)]
    lives: Vec<Live>,
    #[serde(default)]
    forecasts: Vec<Forecast>,
}

#[derive(Debug, Deserialize)]
struct Live {
    #[serde(default, deserialize_with = "lenient")]
    weather: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    temperature: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    winddirection: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    windpower: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    humidity: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    reporttime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    #[serde(default)]
    casts: Vec<Cast>,
}

#[derive(Debug, Deserialize)]
struct Cast {
    #[serde(default, deserialize_with = "lenient")]
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    dayweather: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    nightweather: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    daytemp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    nighttemp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    daywind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    daypower: Option<String>,
}

impl WeatherInfoResponse {
    fn into_current(self) -> Result<WeatherReport, QueryError> {
        let live = self.lives.into_iter().next().ok_or_else(|| QueryError::malformed(["lives"]))?;

        let mut fields = FieldCheck::new("lives[0]");
        let condition = fields.text(live.weather, "weather");
        let temperature = fields.number(live.temperature.as_deref(), "temperature");

        match (condition, temperature) {
            (Some(condition), Some(temperature)) => Ok(WeatherReport {
                date: None,
                observed_at: live.reporttime.as_deref().and_then(parse_report_time),
                condition,
                night_condition: None,
                temperature: Temperature::Current(temperature),
                wind: Wind::new(live.winddirection, live.windpower),
                humidity_pct: live.humidity.as_deref().and_then(parse_humidity),
            }),
            _ => Err(fields.into_error()),
        }
    }

    fn into_forecast(self) -> Result<Vec<WeatherReport>, QueryError> {
        let forecast =
            self.forecasts.into_iter().next().ok_or_else(|| QueryError::malformed(["forecasts"]))?;

        if forecast.casts.is_empty() {
            return Err(QueryError::malformed(["forecasts[0].casts"]));
        }

        let mut reports = Vec::with_capacity(forecast.casts.len());
        let mut missing = Vec::new();

        for (i, cast) in forecast.casts.into_iter().enumerate() {
            match cast.into_report(i) {
                Ok(report) => reports.push(report),
                Err(fields) => missing.extend(fields),
            }
        }

        if missing.is_empty() { Ok(reports) } else { Err(QueryError::malformed(missing)) }
    }
}

impl Cast {
    fn into_report(self, index: usize) -> Result<WeatherReport, Vec<String>> {
        let mut fields = FieldCheck::new(format!("forecasts[0].casts[{index}]"));

        let date = fields.date(self.date.as_deref(), "date");
        let condition = fields.text(self.dayweather, "dayweather");
        let day_temp = fields.number(self.daytemp.as_deref(), "daytemp");
        let night_temp = fields.number(self.nighttemp.as_deref(), "nighttemp");

        let (Some(date), Some(condition), Some(day_temp), Some(night_temp)) =
            (date, condition, day_temp, night_temp)
        else {
            return Err(fields.missing);
        };

        let night_condition = self.nightweather.filter(|night| *night != condition);

        Ok(WeatherReport {
            date: Some(date),
            observed_at: None,
            condition,
            night_condition,
            temperature: Temperature::Range {
                low: day_temp.min(night_temp),
                high: day_temp.max(night_temp),
            },
            wind: Wind::new(self.daywind, self.daypower),
            humidity_pct: None,
        })
    }
}

/// Collects the dotted paths of required fields that are absent or unparsable.
struct FieldCheck {
    prefix: String,
    missing: Vec<String>,
}

impl FieldCheck {
    fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), missing: Vec::new() }
    }

    fn record<T>(&mut self, value: Option<T>, name: &str) -> Option<T> {
        if value.is_none() {
            self.missing.push(format!("{}.{}", self.prefix, name));
        }
        value
    }

    fn text(&mut self, value: Option<String>, name: &str) -> Option<String> {
        self.record(value, name)
    }

    fn number(&mut self, value: Option<&str>, name: &str) -> Option<f64> {
        self.record(value.and_then(|v| v.parse::<f64>().ok()), name)
    }

    fn date(&mut self, value: Option<&str>, name: &str) -> Option<NaiveDate> {
        self.record(value.and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok()), name)
    }

    fn into_error(self) -> QueryError {
        QueryError::malformed(self.missing)
    }
}

fn parse_report_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()
}

fn parse_humidity(s: &str) -> Option<u8> {
    let value = s.trim_end_matches('%').parse::<f64>().ok()?;
    Some(value.round().clamp(0.0, 100.0) as u8)
}

/// Accepts a string, a number, `[]`/`["..."]` or null; blank means absent.
fn lenient<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;

    Ok(match value {
        Some(Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    })
}

/// The request URL carries the key, so it is dropped from the error before it goes anywhere.
fn transport_error(endpoint: &str, err: reqwest::Error) -> QueryError {
    let kind = if err.is_timeout() { "timed out" } else { "request failed" };
    let err = err.without_url();
    warn!(endpoint, error = %err, "AMap {kind}");
    QueryError::unavailable(format!("{endpoint} {kind}"))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
