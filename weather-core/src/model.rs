use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Whether a query asks for present conditions or a multi-day forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Current,
    Forecast,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Current => "current",
            Mode::Forecast => "forecast",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    /// Parses the provider's `"lon,lat"` notation.
    pub fn parse(s: &str) -> Option<Self> {
        let (lon, lat) = s.split_once(',')?;
        Some(Self { longitude: lon.trim().parse().ok()?, latitude: lat.trim().parse().ok()? })
    }
}

/// Exactly one provider-recognized place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    /// Administrative division code used by the weather endpoint.
    pub adcode: String,
    /// Canonical display name, never empty.
    pub name: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Temperature {
    /// Observed value in °C.
    Current(f64),
    /// Daily low/high in °C.
    Range { low: f64, high: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wind {
    pub direction: Option<String>,
    /// Beaufort force as reported by the provider, e.g. `"≤3"`.
    pub power: Option<String>,
}

impl Wind {
    /// `None` when neither part is known.
    pub fn new(direction: Option<String>, power: Option<String>) -> Option<Self> {
        if direction.is_none() && power.is_none() {
            None
        } else {
            Some(Self { direction, power })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// Calendar day of a forecast entry.
    pub date: Option<NaiveDate>,
    /// Publication time of an observation.
    pub observed_at: Option<NaiveDateTime>,
    pub condition: String,
    /// Night condition of a forecast day, when it differs from the day's.
    pub night_condition: Option<String>,
    pub temperature: Temperature,
    pub wind: Option<Wind>,
    pub humidity_pct: Option<u8>,
}

/// What the fetcher hands to the formatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Weather {
    Current(WeatherReport),
    /// Per-day reports in calendar order, earliest first.
    Forecast(Vec<WeatherReport>),
}

impl Weather {
    pub fn mode(&self) -> Mode {
        match self {
            Weather::Current(_) => Mode::Current,
            Weather::Forecast(_) => Mode::Forecast,
        }
    }
}
