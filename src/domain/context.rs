//! Shared planning context threaded through the pipeline

use serde::Serialize;

use super::candidate::Candidate;
use super::commitment::Commitment;
use super::itinerary::Itinerary;
use super::selection::Selection;

/// A recoverable per-item failure recorded during the run
///
/// Issues never abort the run; they accumulate so a terminal error (or the
/// final plan) can surface everything that went wrong along the way.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RunIssue {
    /// A calendar line that did not match the expected shape
    Parse { line_no: usize, line: String, reason: String },
    /// A location that could not be resolved to a coordinate
    Geocode {
        commitment_id: String,
        location: String,
        reason: String,
    },
}

impl std::fmt::Display for RunIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse { line_no, line, reason } => {
                write!(f, "line {}: {} ({:?})", line_no, reason, line)
            }
            Self::Geocode {
                commitment_id,
                location,
                reason,
            } => {
                write!(f, "geocode '{}' for {}: {}", location, commitment_id, reason)
            }
        }
    }
}

/// The aggregate state of one planning run
///
/// Created once per run and exclusively owned by the orchestrator. Each
/// stage reads what it needs and appends to its own section; no stage
/// touches another stage's section. The issue log is append-only and never
/// cleared. A context is never reused across runs.
#[derive(Debug, Default, Serialize)]
pub struct PlanningContext {
    pub commitments: Vec<Commitment>,
    pub candidates: Vec<Candidate>,
    pub selections: Vec<Selection>,
    pub itinerary: Option<Itinerary>,
    issues: Vec<RunIssue>,
}

impl PlanningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_issue(&mut self, issue: RunIssue) {
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[RunIssue] {
        &self.issues
    }

    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn resolved_commitments(&self) -> impl Iterator<Item = &Commitment> {
        self.commitments.iter().filter(|c| c.is_resolved())
    }

    pub fn unresolved_commitments(&self) -> impl Iterator<Item = &Commitment> {
        self.commitments.iter().filter(|c| !c.is_resolved())
    }
}
