//! Greedy nearest-neighbor construction.
//!
//! From the current position, visit the unvisited stop with the lowest
//! incremental cost among those that can still be reached before their
//! window closes. Candidates that would make another currently reachable
//! stop miss its window are used only when nothing safer exists.
//! Unreachable stops stay in the pool and are re-checked every step; once
//! only unreachable stops remain, the cheapest is taken. Ties go to the
//! smallest stop id.

use crate::budget::SearchBudget;
use crate::schedule::{COST_EPSILON, Evaluator, Visit};
use crate::strategy::SearchOutcome;

/// Lower is preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    /// Reachable, and every other reachable stop stays reachable after it.
    Safe,
    Reachable,
    Late,
}

struct Candidate {
    position: usize,
    tier: Tier,
    cost: f64,
    visit: Visit,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        self.tier < other.tier || (self.tier == other.tier && self.cost < other.cost - COST_EPSILON)
    }
}

pub fn search(evaluator: &Evaluator<'_>, budget: &SearchBudget) -> SearchOutcome {
    let stops = evaluator.stops();
    let mut remaining: Vec<usize> = (0..stops.len()).collect();
    remaining.sort_by(|a, b| stops[*a].id().cmp(stops[*b].id()));

    let mut order = Vec::with_capacity(remaining.len());
    let mut node = 0;
    let mut time = evaluator.departure();

    while !remaining.is_empty() {
        if let Some(interrupt) = budget.check() {
            // Finish in id order so callers still get a full tour.
            let steps = order.len();
            order.extend(remaining);
            return SearchOutcome::interrupted(order, interrupt, steps);
        }

        let visits: Vec<Visit> = remaining
            .iter()
            .map(|&stop| evaluator.visit(node, time, stop))
            .collect();

        let mut best: Option<Candidate> = None;
        for (position, &stop) in remaining.iter().enumerate() {
            let visit = visits[position];
            let tier = if visit.late {
                Tier::Late
            } else if keeps_others_reachable(evaluator, &remaining, &visits, position) {
                Tier::Safe
            } else {
                Tier::Reachable
            };
            let candidate = Candidate {
                position,
                tier,
                cost: evaluator.visit_cost(stop, time, &visit),
                visit,
            };
            if best.as_ref().is_none_or(|current| candidate.beats(current)) {
                best = Some(candidate);
            }
        }

        let Some(chosen) = best else { break };
        let stop = remaining.remove(chosen.position);
        if chosen.tier == Tier::Late {
            tracing::trace!(stop = %stops[stop].id(), "no reachable stop left, taking cheapest late stop");
        }
        order.push(stop);
        time = chosen.visit.departure;
        node = stop + 1;
    }

    let steps = order.len();
    SearchOutcome::finished(order, steps)
}

/// Whether serving `remaining[chosen]` next still lets every other stop
/// that is reachable now be reached in time directly afterwards.
fn keeps_others_reachable(evaluator: &Evaluator<'_>, remaining: &[usize], visits: &[Visit], chosen: usize) -> bool {
    let from = remaining[chosen] + 1;
    let time = visits[chosen].departure;
    remaining
        .iter()
        .zip(visits)
        .enumerate()
        .filter(|(position, (_, visit))| *position != chosen && !visit.late)
        .all(|(_, (&other, _))| !evaluator.visit(from, time, other).late)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::CancellationToken;
    use crate::config::CostWeights;
    use crate::matrix::TravelMatrix;
    use crate::model::{Coordinate, Stop};
    use crate::planar::EuclideanCostModel;

    fn run(stops: &[Stop], budget: &SearchBudget) -> Vec<String> {
        let matrix = TravelMatrix::build(Coordinate::new(0.0, 0.0), stops, &EuclideanCostModel::default()).unwrap();
        let evaluator = Evaluator::new(&matrix, stops, CostWeights::default(), 0.0);
        search(&evaluator, budget)
            .order
            .into_iter()
            .map(|i| stops[i].id().to_string())
            .collect()
    }

    #[test]
    fn test_ties_break_on_smallest_id() {
        let stops = vec![Stop::new("z", (0.0, 1.0)), Stop::new("m", (1.0, 0.0))];
        assert_eq!(run(&stops, &SearchBudget::unlimited()), vec!["m", "z"]);
    }

    #[test]
    fn test_deadline_pulls_far_stop_forward() {
        let stops = vec![
            Stop::new("near", (1.0, 0.0)),
            Stop::new("far", (0.0, -5.0)).with_window(0.0, 5.5),
        ];
        // near first would reach far at 1 + sqrt(26) > 5.5
        assert_eq!(run(&stops, &SearchBudget::unlimited()), vec!["far", "near"]);
    }

    #[test]
    fn test_unreachable_stop_is_deferred_not_dropped() {
        let stops = vec![
            Stop::new("a", (1.0, 0.0)),
            Stop::new("late", (50.0, 0.0)).with_window(0.0, 1.0),
            Stop::new("b", (2.0, 0.0)),
        ];
        assert_eq!(run(&stops, &SearchBudget::unlimited()), vec!["a", "b", "late"]);
    }

    #[test]
    fn test_cancelled_still_returns_full_tour() {
        let token = CancellationToken::new();
        token.cancel();
        let budget = SearchBudget::unlimited().with_token(token);
        let stops = vec![Stop::new("b", (2.0, 0.0)), Stop::new("a", (1.0, 0.0))];
        assert_eq!(run(&stops, &budget), vec!["a", "b"]);
    }
}
