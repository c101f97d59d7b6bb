use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::QueryError,
    model::{ResolvedLocation, WeatherReport},
};

pub mod amap;

#[cfg(test)]
pub(crate) mod fake;

/// Geocoding + weather capabilities of a third-party provider.
///
/// Every call is one outbound request; implementations must translate their
/// transport and payload failures into [`QueryError`].
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Candidate places for a free-text address, highest-ranked first.
    async fn geocode(&self, address: &str) -> Result<Vec<ResolvedLocation>, QueryError>;

    /// Present conditions at `location`.
    async fn current(&self, location: &ResolvedLocation) -> Result<WeatherReport, QueryError>;

    /// Per-day forecast at `location`, in the order the provider returns it.
    async fn forecast(&self, location: &ResolvedLocation)
    -> Result<Vec<WeatherReport>, QueryError>;
}
