//! Core library answering spoken Chinese weather questions ("北京的天气",
//! "上海明天天气怎么样") through the AMap geocoding and weather web service.
//!
//! This crate defines:
//! - Configuration & credential handling
//! - The provider abstraction and its AMap implementation
//! - Location resolution, weather fetching and answer formatting
//! - [`QueryPipeline`], the single `answer(text) -> String` entry point for a host
//!
//! It is used by `amap-weather-cli`, but any host that can supply a [`Config`]
//! can embed it.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod format;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod query;
pub mod resolver;

pub use config::{ApiKey, Config};
pub use error::QueryError;
pub use fetcher::WeatherFetcher;
pub use model::{Mode, ResolvedLocation, Weather, WeatherReport};
pub use pipeline::{QueryPipeline, Stage};
pub use provider::{WeatherProvider, amap::AmapProvider};
pub use query::{LocationQuery, TimeIntent};
pub use resolver::LocationResolver;
