//! Dayfare - day-dining itinerary planner
//!
//! Dayfare reconciles a user's fixed calendar commitments with flexible
//! dining stops chosen from location-tagged candidates, producing one
//! time- and distance-feasible ordered schedule for the day.
//!
//! # Pipeline
//!
//! A single orchestrating flow drives the stages over one shared
//! [`domain::PlanningContext`]:
//!
//! 1. [`calendar`] - extract timed, located commitments from calendar text
//! 2. [`geocode`] - resolve location phrases to coordinates (cached,
//!    failure-isolated, internally concurrent)
//! 3. [`candidates`] - snapshot dining candidates for the area
//! 4. [`selection`] - delegate venue choice to the decision capability and
//!    validate the answer
//! 5. [`itinerary`] - merge commitments and selections into the final
//!    schedule, or report infeasibility
//!
//! Per-item failures (a malformed calendar line, one unresolvable location)
//! are logged on the context and never abort the run; structural failures
//! (candidate fetch, rejected selection, infeasibility, timeout) end it
//! with the full issue log attached.

pub mod calendar;
pub mod candidates;
pub mod cli;
pub mod config;
pub mod domain;
pub mod geocode;
pub mod itinerary;
pub mod llm;
pub mod pipeline;
pub mod presentation;
pub mod prompts;
pub mod selection;

// Re-export commonly used types
pub use calendar::{ParsedCalendar, extract, render_line};
pub use candidates::{AreaQuery, CandidateFilters, CandidateSource, CandidateSourceError, OverpassSource};
pub use config::{CandidateConfig, Config, GeocodeConfig, ItineraryConfig, LlmConfig, PipelineConfig, SelectionConfig};
pub use domain::{
    Candidate, Commitment, Coordinate, Itinerary, ItineraryStop, MealRole, PlanningContext, PriceTier, Resolution,
    RunIssue, Selection, StopKind,
};
pub use geocode::{GeocodeError, Geocoder, NominatimGeocoder, ResolutionFailure, Resolver};
pub use itinerary::{GapMiss, InfeasibleError, ItineraryBuilder};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError};
pub use pipeline::{PlanError, PlanOutcome, Planner};
pub use presentation::{LlmNarrator, Narrator, render_plain};
pub use selection::{SelectionError, SelectionStage};
