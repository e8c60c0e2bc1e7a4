//! Fixed calendar commitments

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;
use super::id::generate_id;

/// Location resolution state of a commitment
///
/// `Resolved` always carries a coordinate; `Unresolved` never does.
/// Unresolved commitments keep their time window for temporal reasoning but
/// are excluded from all distance computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "coordinate", rename_all = "lowercase")]
pub enum Resolution {
    Pending,
    Resolved(Coordinate),
    Unresolved,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::Resolved(coord) => Some(*coord),
            _ => None,
        }
    }
}

/// A fixed, time-bound obligation from the user's calendar
///
/// Created by the calendar extractor; the geocode stage is the only writer
/// afterwards (resolution transition), then the record is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    pub id: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub description: String,
    /// Raw location phrase from the calendar line; empty when the line
    /// carried no location (such commitments are never geocoded)
    pub location_text: String,
    #[serde(flatten)]
    pub resolution: Resolution,
}

impl Commitment {
    pub fn new(
        start: NaiveTime,
        end: NaiveTime,
        description: impl Into<String>,
        location_text: impl Into<String>,
    ) -> Self {
        let description = description.into();
        let location_text = location_text.into();
        Self {
            id: generate_id("commitment", &description),
            start,
            end,
            description,
            location_text,
            resolution: Resolution::Pending,
        }
    }

    /// Whether this commitment carries a location phrase worth geocoding
    pub fn has_location(&self) -> bool {
        !self.location_text.is_empty()
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.resolution.coordinate()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_resolved()
    }

    pub fn mark_resolved(&mut self, coordinate: Coordinate) {
        self.resolution = Resolution::Resolved(coordinate);
    }

    pub fn mark_unresolved(&mut self) {
        self.resolution = Resolution::Unresolved;
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_new_commitment_pending() {
        let c = Commitment::new(t(9, 0), t(10, 0), "Team standup", "");
        assert_eq!(c.resolution, Resolution::Pending);
        assert!(!c.has_location());
        assert!(c.coordinate().is_none());
        assert!(c.id.contains("-commitment-"));
    }

    #[test]
    fn test_resolution_transitions() {
        let mut c = Commitment::new(t(17, 30), t(18, 30), "Dentist Appointment", "Cambridge Dental");
        assert!(c.has_location());

        c.mark_resolved(Coordinate::new(52.2, 0.12));
        assert!(c.is_resolved());
        assert_eq!(c.coordinate(), Some(Coordinate::new(52.2, 0.12)));

        let mut c2 = Commitment::new(t(12, 0), t(13, 0), "Lunch meeting", "Nowhere Special");
        c2.mark_unresolved();
        assert!(!c2.is_resolved());
        assert!(c2.coordinate().is_none());
    }

    #[test]
    fn test_duration() {
        let c = Commitment::new(t(9, 0), t(10, 30), "Workshop", "The Guildhall");
        assert_eq!(c.duration(), chrono::Duration::minutes(90));
    }
}
