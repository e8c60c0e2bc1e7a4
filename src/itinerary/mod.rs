//! Itinerary building
//!
//! Merges fixed commitments and validated selections into one ordered,
//! time- and distance-feasible schedule. The placement policy is a greedy
//! nearest-feasible-gap heuristic: deterministic and explainable (every
//! placement traces to one gap comparison) rather than globally optimal.

mod builder;
mod gaps;

pub use builder::{GapMiss, InfeasibleError, ItineraryBuilder};
