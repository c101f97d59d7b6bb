//! Location resolution: free-text place phrase to exactly one provider location.

use tracing::debug;

use crate::{
    error::QueryError, model::ResolvedLocation, provider::WeatherProvider, query::place_name,
};

/// Turns a place phrase into a [`ResolvedLocation`] via the provider's geocoder.
#[derive(Debug, Clone, Copy)]
pub struct LocationResolver<'a> {
    provider: &'a dyn WeatherProvider,
}

impl<'a> LocationResolver<'a> {
    pub fn new(provider: &'a dyn WeatherProvider) -> Self {
        Self { provider }
    }

    /// Time qualifiers in `text` are ignored. When the provider returns several
    /// candidates the first (highest-ranked) one wins.
    pub async fn resolve(&self, text: &str) -> Result<ResolvedLocation, QueryError> {
        let place = place_name(text);
        if place.is_empty() {
            return Err(QueryError::NoLocationFound);
        }

        debug!("Geocoding location name: {}", place);

        let candidates = self.provider.geocode(&place).await?;
        let count = candidates.len();

        let mut location = candidates
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::location_not_found(place.as_str()))?;

        if count > 1 {
            debug!("{} candidates for {}, using {} ({})", count, place, location.name, location.adcode);
        }

        if location.name.trim().is_empty() {
            location.name = place;
        }

        debug!("Resolved location: {} ({})", location.name, location.adcode);

        Ok(location)
    }
}
