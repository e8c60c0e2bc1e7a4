//! Greedy gap-based meal placement

use chrono::{Duration, NaiveTime};
use thiserror::Error;
use tracing::{debug, info};

use super::gaps::{find_gaps, TimelineStop};
use crate::config::ItineraryConfig;
use crate::domain::{Commitment, Coordinate, Itinerary, ItineraryStop, MealRole, PlanningContext, StopKind};

/// A gap that was evaluated for a role and found too small
#[derive(Debug, Clone)]
pub struct GapMiss {
    pub gap_start: NaiveTime,
    pub gap_minutes: i64,
    pub required_minutes: i64,
}

/// No placement satisfies the duration and travel constraints for a role
///
/// Carries the nearest-miss gaps for the role's top-ranked candidate so the
/// failure is diagnosable, plus the partial schedule built before the role
/// failed; the builder never drops a meal or resizes a window to force a
/// fit.
#[derive(Debug, Error)]
#[error("No feasible gap for '{role}'{}", format_misses(.misses))]
pub struct InfeasibleError {
    pub role: MealRole,
    pub misses: Vec<GapMiss>,
    /// Everything placed before the failure, still time-sorted
    pub partial: Itinerary,
}

fn format_misses(misses: &[GapMiss]) -> String {
    if misses.is_empty() {
        return " (day is fully booked)".to_string();
    }
    let parts: Vec<String> = misses
        .iter()
        .map(|m| {
            format!(
                "gap {} is {}min, needed {}min",
                m.gap_start.format("%H:%M"),
                m.gap_minutes,
                m.required_minutes
            )
        })
        .collect();
    format!(": {}", parts.join("; "))
}

/// Builds the ordered day schedule from resolved commitments and selections
pub struct ItineraryBuilder {
    config: ItineraryConfig,
}

impl ItineraryBuilder {
    pub fn new(config: ItineraryConfig) -> Self {
        Self { config }
    }

    /// Merge commitments and selections into one feasible schedule
    ///
    /// Commitment windows are seeded verbatim (never resized). Meal roles
    /// are placed in precedence order; within a role, candidates are tried
    /// in rank order and the first with a feasible gap wins. Placed meals
    /// join the timeline, so later placements route around them.
    pub fn build(&self, ctx: &PlanningContext) -> Result<Itinerary, InfeasibleError> {
        let mut stops: Vec<ItineraryStop> = ctx.commitments.iter().map(commitment_stop).collect();
        stops.sort_by_key(|s| s.start);

        let mut roles: Vec<MealRole> = ctx.selections.iter().map(|s| s.role).collect();
        roles.sort();
        roles.dedup();

        for role in roles {
            let mut ranked: Vec<_> = ctx.selections.iter().filter(|s| s.role == role).collect();
            ranked.sort_by_key(|s| s.rank);

            let mut placed = None;
            let mut top_misses: Vec<GapMiss> = Vec::new();

            for (idx, selection) in ranked.iter().enumerate() {
                let candidate = match ctx.candidate(&selection.candidate_id) {
                    Some(c) => c,
                    None => continue,
                };

                match self.place(&stops, candidate.coordinate) {
                    Ok((start, end)) => {
                        debug!(%role, candidate = %candidate.name, %start, "build: placed meal");
                        placed = Some(ItineraryStop {
                            kind: StopKind::Meal,
                            start,
                            end,
                            coordinate: Some(candidate.coordinate),
                            label: candidate.name.clone(),
                            source_id: candidate.id.clone(),
                            role: Some(role),
                        });
                        break;
                    }
                    Err(misses) => {
                        debug!(%role, candidate = %candidate.name, "build: no feasible gap for candidate");
                        if idx == 0 {
                            top_misses = misses;
                        }
                    }
                }
            }

            match placed {
                Some(stop) => {
                    let at = stops.partition_point(|s| s.start <= stop.start);
                    stops.insert(at, stop);
                }
                None => {
                    return Err(InfeasibleError {
                        role,
                        misses: top_misses,
                        partial: Itinerary::new(stops),
                    });
                }
            }
        }

        info!(stop_count = stops.len(), "build: itinerary complete");
        Ok(Itinerary::new(stops))
    }

    /// Choose the best gap for a meal at `coord`
    ///
    /// Feasible gaps must fit the meal duration plus travel to/from their
    /// resolved bounding stops; among those the minimal detour wins, ties
    /// broken by earliest gap start. Returns the nearest-miss record for
    /// every infeasible gap otherwise.
    fn place(
        &self,
        stops: &[ItineraryStop],
        coord: Coordinate,
    ) -> Result<(NaiveTime, NaiveTime), Vec<GapMiss>> {
        let timeline: Vec<TimelineStop> = stops
            .iter()
            .map(|s| TimelineStop {
                start: s.start,
                end: s.end,
                coordinate: s.coordinate,
            })
            .collect();

        let gaps = find_gaps(&timeline, self.config.day_start, self.config.day_end);
        let meal_minutes = self.config.meal_minutes as i64;

        let mut best: Option<(f64, NaiveTime, NaiveTime)> = None;
        let mut misses = Vec::new();

        for gap in gaps {
            let travel_in = self.travel_minutes(gap.before, Some(coord));
            let travel_out = self.travel_minutes(Some(coord), gap.after);
            let required = meal_minutes + travel_in + travel_out;

            if gap.minutes() < required {
                misses.push(GapMiss {
                    gap_start: gap.start,
                    gap_minutes: gap.minutes(),
                    required_minutes: required,
                });
                continue;
            }

            let detour = detour_km(gap.before, coord, gap.after);
            // Gaps come in time order, so strict comparison keeps the
            // earliest gap on detour ties
            if best.as_ref().is_none_or(|(d, _, _)| detour + 1e-9 < *d) {
                let start = gap.start + Duration::minutes(travel_in);
                best = Some((detour, start, start + Duration::minutes(meal_minutes)));
            }
        }

        match best {
            Some((_, start, end)) => Ok((start, end)),
            None => Err(misses),
        }
    }

    /// Straight-line travel time in whole minutes; zero when either side
    /// has no coordinate
    fn travel_minutes(&self, from: Option<Coordinate>, to: Option<Coordinate>) -> i64 {
        match (from, to) {
            (Some(a), Some(b)) => ((a.distance_km(&b) / self.config.speed_kmh) * 60.0).ceil() as i64,
            _ => 0,
        }
    }
}

/// Extra travel of visiting `coord` versus going directly between the
/// bounding stops; legs without a resolved anchor contribute their known
/// half only
fn detour_km(before: Option<Coordinate>, coord: Coordinate, after: Option<Coordinate>) -> f64 {
    match (before, after) {
        (Some(a), Some(b)) => a.distance_km(&coord) + coord.distance_km(&b) - a.distance_km(&b),
        (Some(a), None) => a.distance_km(&coord),
        (None, Some(b)) => coord.distance_km(&b),
        (None, None) => 0.0,
    }
}

fn commitment_stop(c: &Commitment) -> ItineraryStop {
    ItineraryStop {
        kind: StopKind::Commitment,
        start: c.start,
        end: c.end,
        coordinate: c.coordinate(),
        label: c.description.clone(),
        source_id: c.id.clone(),
        role: None,
    }
}
