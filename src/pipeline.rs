//! Pipeline orchestration
//!
//! Drives the stages in order over one exclusively-owned planning context:
//! extract -> geocode -> fetch candidates -> select -> build itinerary.
//! Stages never overlap; parallelism lives inside a stage (geocoding) and
//! is always joined before the next stage starts. The whole run sits under
//! one timeout; on expiry, in-flight work is abandoned and the partial
//! context is kept for diagnostics.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::calendar;
use crate::candidates::{AreaQuery, CandidateFilters, CandidateSource, CandidateSourceError};
use crate::config::Config;
use crate::domain::PlanningContext;
use crate::geocode::{Geocoder, Resolver};
use crate::itinerary::{InfeasibleError, ItineraryBuilder};
use crate::llm::LlmClient;
use crate::selection::{SelectionError, SelectionStage};

/// Structural failures that end a run
///
/// Per-item failures (parse, geocode) never appear here; they live in the
/// context's issue log.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Could not locate planning area '{area}': {reason}")]
    AreaResolution { area: String, reason: String },

    #[error("Candidate source failed: {0}")]
    CandidateSource(#[from] CandidateSourceError),

    #[error("Selection rejected: {0}")]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Infeasible(#[from] InfeasibleError),

    #[error("Run timed out after {0:?}")]
    Timeout(Duration),
}

/// Everything a finished (or aborted) run leaves behind
///
/// The context is returned in both cases: on success it carries the
/// itinerary, on failure whatever partial state the run reached plus the
/// issue log.
pub struct PlanOutcome {
    pub context: PlanningContext,
    pub result: Result<(), PlanError>,
}

/// The orchestrator: owns the stage collaborators and the run loop
pub struct Planner {
    config: Config,
    resolver: Resolver,
    source: Arc<dyn CandidateSource>,
    selection: SelectionStage,
}

impl Planner {
    pub fn new(
        config: Config,
        geocoder: Arc<dyn Geocoder>,
        source: Arc<dyn CandidateSource>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let resolver = Resolver::new(geocoder, config.geocode.max_retries);
        let selection = SelectionStage::new(llm, config.selection.clone());
        Self {
            config,
            resolver,
            source,
            selection,
        }
    }

    /// Run the full pipeline for one calendar document
    pub async fn run(&self, calendar_text: &str) -> PlanOutcome {
        let mut ctx = PlanningContext::new();
        let deadline = Duration::from_millis(self.config.pipeline.run_timeout_ms);

        let result = match tokio::time::timeout(deadline, self.run_stages(&mut ctx, calendar_text)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?deadline, "run: timed out, abandoning in-flight work");
                Err(PlanError::Timeout(deadline))
            }
        };

        if let Err(e) = &result {
            warn!(error = %e, issues = ctx.issues().len(), "run: ended with terminal error");
        }
        PlanOutcome { context: ctx, result }
    }

    async fn run_stages(&self, ctx: &mut PlanningContext, calendar_text: &str) -> Result<(), PlanError> {
        // Stage 1: calendar extraction (best-effort, per-line recovery)
        let parsed = calendar::extract(calendar_text);
        info!(
            commitments = parsed.commitments.len(),
            skipped = parsed.issues.len(),
            "run_stages: calendar extracted"
        );
        ctx.commitments = parsed.commitments;
        for issue in parsed.issues {
            ctx.push_issue(issue);
        }

        // Stage 2: geocoding (internally concurrent, joined here)
        self.resolver.resolve_commitments(ctx).await;
        info!(
            resolved = ctx.resolved_commitments().count(),
            unresolved = ctx.unresolved_commitments().count(),
            "run_stages: geocoding complete"
        );

        // Stage 3: candidate snapshot (fatal on failure, no retry)
        let center = self
            .resolver
            .resolve(&self.config.geocode.area_hint)
            .await
            .map_err(|failure| PlanError::AreaResolution {
                area: self.config.geocode.area_hint.clone(),
                reason: failure.to_string(),
            })?;
        let area = AreaQuery {
            center,
            radius_m: self.config.candidates.radius_m,
        };
        let filters = CandidateFilters {
            cuisine: self.config.candidates.cuisine.clone(),
            price: self.config.candidates.price,
        };
        ctx.candidates = self.source.fetch(&area, &filters).await?;
        info!(candidates = ctx.candidates.len(), "run_stages: candidates fetched");

        // Stage 4: selection, with one re-attempt on validation failure
        let selections = match self.selection.select(ctx).await {
            Ok(selections) => selections,
            Err(e) if e.is_validation() => {
                warn!(error = %e, "run_stages: selection rejected, re-attempting once");
                self.selection.select(ctx).await?
            }
            Err(e) => return Err(e.into()),
        };
        ctx.selections = selections;

        // Stage 5: itinerary build
        match ItineraryBuilder::new(self.config.itinerary.clone()).build(ctx) {
            Ok(itinerary) => {
                ctx.itinerary = Some(itinerary);
                info!("run_stages: itinerary built");
                Ok(())
            }
            Err(e) => {
                // The partial schedule is still worth surfacing alongside
                // the diagnostic
                ctx.itinerary = Some(e.partial.clone());
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveTime;

    use crate::candidates::CandidateFilters;
    use crate::domain::{Candidate, Coordinate};
    use crate::geocode::GeocodeError;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionResponse, StopReason, TokenUsage, ToolCall};

    struct FixedGeocoder;

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, location: &str) -> Result<Coordinate, GeocodeError> {
            if location.contains("Atlantis") {
                Err(GeocodeError::NotFound)
            } else {
                Ok(Coordinate::new(52.2053, 0.1218))
            }
        }
    }

    struct SlowGeocoder;

    #[async_trait]
    impl Geocoder for SlowGeocoder {
        async fn geocode(&self, _location: &str) -> Result<Coordinate, GeocodeError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(GeocodeError::NotFound)
        }
    }

    struct StaticSource(Vec<Candidate>);

    #[async_trait]
    impl CandidateSource for StaticSource {
        async fn fetch(
            &self,
            _area: &AreaQuery,
            _filters: &CandidateFilters,
        ) -> Result<Vec<Candidate>, CandidateSourceError> {
            if self.0.is_empty() {
                Err(CandidateSourceError::Empty)
            } else {
                Ok(self.0.clone())
            }
        }
    }

    fn candidates() -> Vec<Candidate> {
        ["osm-1", "osm-2", "osm-3"]
            .iter()
            .enumerate()
            .map(|(i, id)| Candidate {
                id: id.to_string(),
                name: format!("Venue {}", i + 1),
                coordinate: Coordinate::new(52.204 + 0.001 * i as f64, 0.118),
                category: "cafe".to_string(),
                score: 0.5,
                price: None,
            })
            .collect()
    }

    fn selection_response() -> CompletionResponse {
        CompletionResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "tc_1".to_string(),
                name: "submit_selection".to_string(),
                input: serde_json::json!({
                    "selections": [
                        { "candidate_id": "osm-1", "role": "breakfast", "rank": 0 },
                        { "candidate_id": "osm-2", "role": "lunch", "rank": 0 },
                        { "candidate_id": "osm-3", "role": "dinner", "rank": 0 },
                    ]
                }),
            }],
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }

    fn bad_selection_response() -> CompletionResponse {
        CompletionResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "tc_1".to_string(),
                name: "submit_selection".to_string(),
                input: serde_json::json!({
                    "selections": [
                        { "candidate_id": "osm-404", "role": "breakfast", "rank": 0 },
                    ]
                }),
            }],
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }

    fn planner(geocoder: Arc<dyn Geocoder>, source: Arc<dyn CandidateSource>, llm: Arc<MockLlmClient>) -> Planner {
        Planner::new(Config::default(), geocoder, source, llm)
    }

    const CALENDAR: &str = "\
09:00 - 10:00  Standup at The Bradfield Centre
13:30 - 14:30  Mystery errand at Atlantis
not a calendar line
17:30 - 18:30  Dentist Appointment at Cambridge Dental";

    #[tokio::test]
    async fn test_full_run_produces_itinerary() {
        let llm = Arc::new(MockLlmClient::new(vec![selection_response()]));
        let planner = planner(Arc::new(FixedGeocoder), Arc::new(StaticSource(candidates())), llm);

        let outcome = planner.run(CALENDAR).await;
        outcome.result.as_ref().unwrap();

        let itinerary = outcome.context.itinerary.as_ref().unwrap();
        assert!(itinerary.is_time_sorted());
        assert!(!itinerary.has_overlap());
        assert_eq!(itinerary.meals().count(), 3);

        // Parse failure and geocode failure both logged, run still completed
        assert_eq!(outcome.context.issues().len(), 2);
        // The unresolved commitment survived as a marker
        assert_eq!(outcome.context.unresolved_commitments().count(), 1);
    }

    #[tokio::test]
    async fn test_candidate_source_failure_is_fatal() {
        let llm = Arc::new(MockLlmClient::new(vec![selection_response()]));
        let planner = planner(Arc::new(FixedGeocoder), Arc::new(StaticSource(vec![])), llm);

        let outcome = planner.run(CALENDAR).await;
        assert!(matches!(outcome.result, Err(PlanError::CandidateSource(_))));
        assert!(outcome.context.itinerary.is_none());
        // Partial state reached before the failure is preserved
        assert_eq!(outcome.context.commitments.len(), 3);
    }

    #[tokio::test]
    async fn test_selection_validation_gets_one_retry() {
        let llm = Arc::new(MockLlmClient::new(vec![bad_selection_response(), selection_response()]));
        let planner = planner(Arc::new(FixedGeocoder), Arc::new(StaticSource(candidates())), llm.clone());

        let outcome = planner.run(CALENDAR).await;
        outcome.result.as_ref().unwrap();
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_selection_fails_after_second_rejection() {
        let llm = Arc::new(MockLlmClient::new(vec![bad_selection_response(), bad_selection_response()]));
        let planner = planner(Arc::new(FixedGeocoder), Arc::new(StaticSource(candidates())), llm.clone());

        let outcome = planner.run(CALENDAR).await;
        assert!(matches!(outcome.result, Err(PlanError::Selection(_))));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_run_timeout_preserves_partial_context() {
        let llm = Arc::new(MockLlmClient::new(vec![selection_response()]));
        let mut config = Config::default();
        config.pipeline.run_timeout_ms = 50;
        config.geocode.max_retries = 0;

        let planner = Planner::new(
            config,
            Arc::new(SlowGeocoder),
            Arc::new(StaticSource(candidates())),
            llm,
        );

        let outcome = planner.run(CALENDAR).await;
        assert!(matches!(outcome.result, Err(PlanError::Timeout(_))));
        // Extraction finished before the stall; its output is preserved
        assert_eq!(outcome.context.commitments.len(), 3);
        assert!(outcome.context.itinerary.is_none());
    }
}
