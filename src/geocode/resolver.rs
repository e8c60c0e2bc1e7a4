//! Caching resolver over a Geocoder
//!
//! Owns the only state shared across concurrent sub-operations in the
//! pipeline: a per-key cache of resolution outcomes. First writer for a key
//! wins; concurrent resolutions of the same key collapse to a single
//! external call with every requester awaiting the same slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{GeocodeError, Geocoder};
use crate::domain::{Coordinate, PlanningContext, RunIssue};

/// Base backoff delay between retry attempts
const RETRY_BACKOFF_MS: u64 = 500;

/// Why a location stayed unresolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    Ambiguous,
    Service,
}

/// Cacheable record of a failed resolution
#[derive(Debug, Clone)]
pub struct ResolutionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl std::fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<GeocodeError> for ResolutionFailure {
    fn from(err: GeocodeError) -> Self {
        let kind = match &err {
            GeocodeError::NotFound => FailureKind::NotFound,
            GeocodeError::Ambiguous(_) => FailureKind::Ambiguous,
            _ => FailureKind::Service,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

type CacheSlot = Arc<OnceCell<Result<Coordinate, ResolutionFailure>>>;

/// Caching, retrying front of the geocoding stage
pub struct Resolver {
    geocoder: Arc<dyn Geocoder>,
    max_retries: u32,
    cache: Mutex<HashMap<String, CacheSlot>>,
}

impl Resolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, max_retries: u32) -> Self {
        Self {
            geocoder,
            max_retries,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Normalize location text for cache keying: lowercase, collapse runs
    /// of whitespace
    pub fn normalize(location: &str) -> String {
        location.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Resolve one location, hitting the cache first
    pub async fn resolve(&self, location: &str) -> Result<Coordinate, ResolutionFailure> {
        let key = Self::normalize(location);
        let slot = {
            let mut cache = self.cache.lock().expect("geocode cache poisoned");
            cache.entry(key).or_default().clone()
        };

        slot.get_or_init(|| self.resolve_uncached(location)).await.clone()
    }

    /// One external resolution with bounded retries on transient failures
    async fn resolve_uncached(&self, location: &str) -> Result<Coordinate, ResolutionFailure> {
        let mut last_error: Option<GeocodeError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let jitter = rand::rng().random_range(0..250);
                let backoff = RETRY_BACKOFF_MS * 2u64.pow(attempt - 1) + jitter;
                warn!(%location, attempt, backoff_ms = backoff, "resolve: retrying after transient failure");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match self.geocoder.geocode(location).await {
                Ok(coord) => {
                    debug!(%location, %coord, "resolve: resolved");
                    return Ok(coord);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    last_error = Some(e);
                }
                Err(e) => {
                    debug!(%location, error = %e, "resolve: terminal failure");
                    return Err(e.into());
                }
            }
        }

        Err(last_error
            .map(ResolutionFailure::from)
            .unwrap_or_else(|| ResolutionFailure {
                kind: FailureKind::Service,
                message: "retries exhausted".to_string(),
            }))
    }

    /// Run the geocode stage over the context's commitments
    ///
    /// Pending commitments with a location phrase are resolved concurrently;
    /// the stage joins on every outstanding resolution before returning, and
    /// outcomes are attributed back by commitment id. Commitments without a
    /// location phrase are marked unresolved without any external call.
    pub async fn resolve_commitments(&self, ctx: &mut PlanningContext) {
        let pending: Vec<(String, String)> = ctx
            .commitments
            .iter()
            .filter(|c| c.has_location())
            .map(|c| (c.id.clone(), c.location_text.clone()))
            .collect();

        debug!(count = pending.len(), "resolve_commitments: fanning out");

        let lookups = pending.iter().map(|(id, location)| async move {
            let outcome = self.resolve(location).await;
            (id.clone(), outcome)
        });
        let outcomes: HashMap<String, Result<Coordinate, ResolutionFailure>> =
            futures::future::join_all(lookups).await.into_iter().collect();

        let mut issues = Vec::new();
        for commitment in ctx.commitments.iter_mut() {
            if !commitment.has_location() {
                commitment.mark_unresolved();
                continue;
            }
            match outcomes.get(&commitment.id) {
                Some(Ok(coord)) => commitment.mark_resolved(*coord),
                Some(Err(failure)) => {
                    commitment.mark_unresolved();
                    // Recorded on the context, not raised: one bad location
                    // must not sink the batch
                    let issue = RunIssue::Geocode {
                        commitment_id: commitment.id.clone(),
                        location: commitment.location_text.clone(),
                        reason: failure.to_string(),
                    };
                    warn!(%issue, "resolve_commitments: commitment left unresolved");
                    issues.push(issue);
                }
                None => commitment.mark_unresolved(),
            }
        }
        for issue in issues {
            ctx.push_issue(issue);
        }
    }
}
