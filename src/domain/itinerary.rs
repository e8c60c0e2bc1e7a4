//! The finished day schedule

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;
use super::meal::MealRole;

/// What a stop in the schedule represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopKind {
    Commitment,
    Meal,
}

/// One ordered entry in the final schedule
///
/// `coordinate` is None only for unresolved commitments, which appear as
/// time-window markers without a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryStop {
    pub kind: StopKind,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub coordinate: Option<Coordinate>,
    /// Human-readable label (commitment description or venue name)
    pub label: String,
    /// Id of the source commitment or selected candidate
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MealRole>,
}

/// The ordered, feasible day schedule
///
/// Only the itinerary builder constructs this; everything downstream
/// consumes it read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Itinerary {
    pub stops: Vec<ItineraryStop>,
}

impl Itinerary {
    pub fn new(stops: Vec<ItineraryStop>) -> Self {
        Self { stops }
    }

    pub fn meals(&self) -> impl Iterator<Item = &ItineraryStop> {
        self.stops.iter().filter(|s| s.kind == StopKind::Meal)
    }

    pub fn commitments(&self) -> impl Iterator<Item = &ItineraryStop> {
        self.stops.iter().filter(|s| s.kind == StopKind::Commitment)
    }

    /// Whether stops are strictly sorted by start time
    pub fn is_time_sorted(&self) -> bool {
        self.stops.windows(2).all(|w| w[0].start < w[1].start)
    }

    /// Whether any two timed, spatially-resolved stops overlap
    pub fn has_overlap(&self) -> bool {
        let placed: Vec<&ItineraryStop> = self.stops.iter().filter(|s| s.coordinate.is_some()).collect();
        placed.windows(2).any(|w| w[1].start < w[0].end)
    }
}
