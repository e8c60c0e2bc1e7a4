//! Dining candidates supplied by the candidate source

use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;

/// Rough price bracket for a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTier {
    Budget,
    Moderate,
    Upscale,
}

impl std::str::FromStr for PriceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "budget" | "cheap" | "$" => Ok(Self::Budget),
            "moderate" | "mid" | "$$" => Ok(Self::Moderate),
            "upscale" | "expensive" | "$$$" => Ok(Self::Upscale),
            _ => Err(format!("Unknown price tier: '{}'", s)),
        }
    }
}

/// A dining option inside the planning area
///
/// Supplied wholesale by the candidate source; immutable within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    /// Venue category, e.g. "restaurant", "cafe", "pub"
    pub category: String,
    /// Relevance/quality score assigned by the source, in [0, 1]
    pub score: f64,
    pub price: Option<PriceTier>,
}
