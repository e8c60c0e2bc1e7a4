//! OSM Nominatim geocoding backend

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{GeocodeError, Geocoder};
use crate::config::GeocodeConfig;
use crate::domain::Coordinate;

/// Geocoder backed by a Nominatim search endpoint
///
/// Queries that do not already mention the planning area get the area hint
/// appended, so "Cambridge Dental" searches as "Cambridge Dental, Cambridge,
/// England" while "Cambridge Dental, Cambridge" goes through untouched.
pub struct NominatimGeocoder {
    http: Client,
    base_url: String,
    area_hint: String,
    ambiguity_margin: f64,
}

impl NominatimGeocoder {
    /// Create a new client from configuration
    pub fn from_config(config: &GeocodeConfig) -> Result<Self, GeocodeError> {
        debug!(base_url = %config.base_url, "from_config: called");
        let http = Client::builder()
            // Nominatim's usage policy requires an identifying agent
            .user_agent(concat!("dayfare/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(GeocodeError::Network)?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            area_hint: config.area_hint.clone(),
            ambiguity_margin: config.ambiguity_margin,
        })
    }

    /// Build the search query, appending the area hint when absent
    fn build_query(&self, location: &str) -> String {
        let area_name = self.area_hint.split(',').next().unwrap_or("").trim();
        if !area_name.is_empty() && location.to_lowercase().contains(&area_name.to_lowercase()) {
            location.to_string()
        } else if self.area_hint.is_empty() {
            location.to_string()
        } else {
            format!("{}, {}", location, self.area_hint)
        }
    }

    /// Pick the confident top result, or classify the failure
    fn pick_result(&self, places: Vec<NominatimPlace>) -> Result<Coordinate, GeocodeError> {
        let mut iter = places.into_iter();
        let top = match iter.next() {
            Some(p) => p,
            None => return Err(GeocodeError::NotFound),
        };

        if let Some(second) = iter.next() {
            let top_importance = top.importance.unwrap_or(0.0);
            let second_importance = second.importance.unwrap_or(0.0);
            if top_importance - second_importance < self.ambiguity_margin {
                debug!(
                    top = %top.display_name,
                    second = %second.display_name,
                    "pick_result: no confident top result"
                );
                return Err(GeocodeError::Ambiguous(format!(
                    "'{}' vs '{}'",
                    top.display_name, second.display_name
                )));
            }
        }

        let lat = top
            .lat
            .parse::<f64>()
            .map_err(|_| GeocodeError::InvalidResponse(format!("bad latitude '{}'", top.lat)))?;
        let lon = top
            .lon
            .parse::<f64>()
            .map_err(|_| GeocodeError::InvalidResponse(format!("bad longitude '{}'", top.lon)))?;

        Ok(Coordinate::new(lat, lon))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, location: &str) -> Result<Coordinate, GeocodeError> {
        let query = self.build_query(location);
        debug!(%location, %query, "geocode: called");

        let url = format!("{}/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("q", query.as_str()), ("format", "jsonv2"), ("limit", "3")])
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(status, "geocode: service error");
            return Err(GeocodeError::Service { status, message });
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        debug!(hits = places.len(), "geocode: got results");
        self.pick_result(places)
    }
}

/// One hit from the Nominatim search endpoint
///
/// Nominatim serializes lat/lon as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    importance: Option<f64>,
}
