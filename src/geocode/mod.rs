//! Geocoding
//!
//! Resolves free-text location phrases to coordinates. The stage is
//! failure-isolated: one location that cannot be resolved marks its
//! commitment unresolved and never fails the batch.
//!
//! The [`Resolver`] owns a process-lifetime cache keyed by normalized
//! location text; concurrent resolutions of the same key collapse to a
//! single external call.

use async_trait::async_trait;

mod error;
mod nominatim;
mod resolver;

pub use error::GeocodeError;
pub use nominatim::NominatimGeocoder;
pub use resolver::{FailureKind, ResolutionFailure, Resolver};

use crate::domain::Coordinate;

/// External geocoding capability: one location phrase to one coordinate
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, location: &str) -> Result<Coordinate, GeocodeError>;
}
