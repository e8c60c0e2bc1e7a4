//! Domain types for Dayfare
//!
//! Core domain types: Commitment, Candidate, Selection, ItineraryStop and
//! the PlanningContext that threads them through the pipeline.
//!
//! All types are plain data. The pipeline stages own the transitions; the
//! only mutation after creation is commitment resolution (geocode stage).

mod candidate;
mod commitment;
mod context;
mod coordinate;
mod id;
mod itinerary;
mod meal;
mod selection;

pub use candidate::{Candidate, PriceTier};
pub use commitment::{Commitment, Resolution};
pub use context::{PlanningContext, RunIssue};
pub use coordinate::Coordinate;
pub use id::generate_id;
pub use itinerary::{Itinerary, ItineraryStop, StopKind};
pub use meal::MealRole;
pub use selection::Selection;
