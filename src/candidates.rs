//! Candidate source adapter
//!
//! External collaborator contract: given an area and filters, return a
//! snapshot of dining candidates with coordinates. The pipeline neither
//! retries nor caches on the adapter's behalf; a failure here is fatal to
//! the run.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::CandidateConfig;
use crate::domain::{Candidate, Coordinate, PriceTier};

/// Amenity categories that count as dining venues
const DINING_CATEGORIES: [&str; 7] = ["restaurant", "pub", "bar", "cafe", "fast_food", "bistro", "food_court"];

/// Tags that make a venue record informative; drives the source score
const INFORMATIVE_TAGS: [&str; 6] = [
    "cuisine",
    "opening_hours",
    "website",
    "phone",
    "outdoor_seating",
    "wheelchair",
];

/// The area to search: a center point and radius
#[derive(Debug, Clone, Copy)]
pub struct AreaQuery {
    pub center: Coordinate,
    pub radius_m: u32,
}

/// Optional candidate filters
#[derive(Debug, Clone, Default)]
pub struct CandidateFilters {
    /// Substring/regex match against the venue's cuisine tag
    pub cuisine: Option<String>,
    /// Keep venues at this tier (venues with unknown price always pass)
    pub price: Option<PriceTier>,
}

/// Errors from the candidate source; all of them end the run
#[derive(Debug, Error)]
pub enum CandidateSourceError {
    #[error("Service error {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No dining candidates found in the area")]
    Empty,
}

/// External source of dining candidates
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch(&self, area: &AreaQuery, filters: &CandidateFilters)
        -> Result<Vec<Candidate>, CandidateSourceError>;
}

/// Candidate source backed by the OSM Overpass API
pub struct OverpassSource {
    http: Client,
    base_url: String,
}

impl OverpassSource {
    /// Create a new client from configuration
    pub fn from_config(config: &CandidateConfig) -> Result<Self, CandidateSourceError> {
        let http = Client::builder()
            .user_agent(concat!("dayfare/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(CandidateSourceError::Network)?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Build the Overpass QL query for named dining amenities in the area
    fn build_query(area: &AreaQuery, filters: &CandidateFilters) -> String {
        let categories = DINING_CATEGORIES.join("|");
        let cuisine_clause = filters
            .cuisine
            .as_ref()
            .map(|c| format!("[\"cuisine\"~\"{}\",i]", c))
            .unwrap_or_default();

        format!(
            "[out:json];node[\"amenity\"~\"^({})$\"][\"name\"]{}(around:{},{},{});out;",
            categories, cuisine_clause, area.radius_m, area.center.lat, area.center.lon
        )
    }

    /// Convert one Overpass element into a candidate
    ///
    /// Unnamed elements were already excluded by the query; this only fails
    /// on malformed geometry.
    fn to_candidate(element: OverpassElement) -> Option<Candidate> {
        let (lat, lon) = match (element.lat, element.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return None,
        };
        let name = element.tags.get("name")?.clone();
        let category = element
            .tags
            .get("amenity")
            .cloned()
            .unwrap_or_else(|| "restaurant".to_string());

        let informative = INFORMATIVE_TAGS
            .iter()
            .filter(|tag| element.tags.contains_key(**tag))
            .count();
        let score = (1.0 + informative as f64) / (1.0 + INFORMATIVE_TAGS.len() as f64);

        let price = element.tags.get("price").and_then(|p| p.parse::<PriceTier>().ok());

        Some(Candidate {
            id: format!("osm-{}", element.id),
            name,
            coordinate: Coordinate::new(lat, lon),
            category,
            score,
            price,
        })
    }
}

#[async_trait]
impl CandidateSource for OverpassSource {
    async fn fetch(
        &self,
        area: &AreaQuery,
        filters: &CandidateFilters,
    ) -> Result<Vec<Candidate>, CandidateSourceError> {
        let query = Self::build_query(area, filters);
        debug!(radius_m = area.radius_m, "fetch: querying Overpass");

        let response = self.http.post(&self.base_url).form(&[("data", &query)]).send().await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CandidateSourceError::Service { status, message });
        }

        let body: OverpassResponse = response
            .json()
            .await
            .map_err(|e| CandidateSourceError::InvalidResponse(e.to_string()))?;

        let candidates: Vec<Candidate> = body
            .elements
            .into_iter()
            .filter_map(Self::to_candidate)
            .filter(|c| match (filters.price, c.price) {
                (Some(wanted), Some(actual)) => wanted == actual,
                _ => true,
            })
            .collect();

        debug!(count = candidates.len(), "fetch: got candidates");
        if candidates.is_empty() {
            return Err(CandidateSourceError::Empty);
        }
        Ok(candidates)
    }
}

/// Overpass API response envelope
#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    id: u64,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(id: u64, name: Option<&str>, extra: &[(&str, &str)]) -> OverpassElement {
        let mut tags = HashMap::new();
        if let Some(name) = name {
            tags.insert("name".to_string(), name.to_string());
        }
        tags.insert("amenity".to_string(), "cafe".to_string());
        for (k, v) in extra {
            tags.insert(k.to_string(), v.to_string());
        }
        OverpassElement {
            id,
            lat: Some(52.2),
            lon: Some(0.12),
            tags,
        }
    }

    #[test]
    fn test_build_query_shape() {
        let area = AreaQuery {
            center: Coordinate::new(52.2053, 0.1218),
            radius_m: 2000,
        };
        let query = OverpassSource::build_query(&area, &CandidateFilters::default());
        assert!(query.contains("around:2000,52.2053,0.1218"));
        assert!(query.contains("restaurant|pub|bar|cafe"));
        assert!(query.contains("[\"name\"]"));
        assert!(!query.contains("cuisine"));
    }

    #[test]
    fn test_build_query_with_cuisine() {
        let area = AreaQuery {
            center: Coordinate::new(52.2053, 0.1218),
            radius_m: 1000,
        };
        let filters = CandidateFilters {
            cuisine: Some("italian".to_string()),
            price: None,
        };
        let query = OverpassSource::build_query(&area, &filters);
        assert!(query.contains("[\"cuisine\"~\"italian\",i]"));
    }

    #[test]
    fn test_to_candidate_scores_by_tag_richness() {
        let bare = OverpassSource::to_candidate(element(1, Some("Plain Cafe"), &[])).unwrap();
        let rich = OverpassSource::to_candidate(element(
            2,
            Some("Rich Cafe"),
            &[("cuisine", "coffee_shop"), ("website", "x"), ("opening_hours", "y")],
        ))
        .unwrap();

        assert!(rich.score > bare.score);
        assert!(bare.score > 0.0 && rich.score <= 1.0);
    }

    #[test]
    fn test_to_candidate_requires_name_and_geometry() {
        assert!(OverpassSource::to_candidate(element(1, None, &[])).is_none());

        let mut no_geometry = element(2, Some("Floating"), &[]);
        no_geometry.lat = None;
        assert!(OverpassSource::to_candidate(no_geometry).is_none());
    }

    #[test]
    fn test_candidate_id_from_element() {
        let c = OverpassSource::to_candidate(element(987, Some("The Eagle"), &[])).unwrap();
        assert_eq!(c.id, "osm-987");
        assert_eq!(c.category, "cafe");
    }
}
