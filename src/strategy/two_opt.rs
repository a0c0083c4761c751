//! 2-opt local search.
//!
//! Starts from the nearest-neighbor tour and reverses segments while that
//! lowers cost. The origin is fixed, so any segment of the stop sequence
//! (including the tail) may be reversed. A move is kept only if it lowers
//! cost and every stop that misses its window afterwards already missed it
//! before, so the result is never worse than its seed.

use crate::budget::{Interrupt, SearchBudget};
use crate::config::TwoOptConfig;
use crate::schedule::{COST_EPSILON, Evaluator, Score};
use crate::strategy::{SearchOutcome, nearest_neighbor};

enum Pass {
    Improved(Score),
    LocalOptimum,
    Interrupted(Interrupt),
}

pub fn search(evaluator: &Evaluator<'_>, budget: &SearchBudget, config: &TwoOptConfig) -> SearchOutcome {
    let seed = nearest_neighbor::search(evaluator, budget);
    if seed.interrupted.is_some() {
        return seed;
    }
    improve(evaluator, seed.order, budget, config.max_iterations)
}

/// Apply improving reversals to `order` until none is left or
/// `max_iterations` moves were made.
pub fn improve(
    evaluator: &Evaluator<'_>,
    mut order: Vec<usize>,
    budget: &SearchBudget,
    max_iterations: usize,
) -> SearchOutcome {
    let mut current = evaluator.score(&order);
    let mut late = evaluator.violated(&order);
    let mut iterations = 0;

    while iterations < max_iterations {
        match improving_reversal(evaluator, &mut order, &current, &late, budget) {
            Pass::Improved(score) => {
                tracing::trace!(iteration = iterations, cost = score.cost, "2-opt move accepted");
                current = score;
                if current.violations > 0 {
                    late = evaluator.violated(&order);
                } else {
                    late.clear();
                }
                iterations += 1;
            }
            Pass::LocalOptimum => break,
            Pass::Interrupted(interrupt) => return SearchOutcome::interrupted(order, interrupt, iterations),
        }
    }

    SearchOutcome::finished(order, iterations)
}

/// First-improvement scan. On success `order` holds the improved tour.
///
/// `late` lists the stops currently missing their window; a reversal that
/// makes any other stop late is skipped even if it fixes one of these.
fn improving_reversal(
    evaluator: &Evaluator<'_>,
    order: &mut [usize],
    current: &Score,
    late: &[usize],
    budget: &SearchBudget,
) -> Pass {
    let n = order.len();
    for i in 0..n.saturating_sub(1) {
        if let Some(interrupt) = budget.check() {
            return Pass::Interrupted(interrupt);
        }
        for j in i + 1..n {
            order[i..=j].reverse();
            let candidate = evaluator.score(order);
            if candidate.violations <= current.violations
                && candidate.cost < current.cost - COST_EPSILON
                && (candidate.violations == 0 || evaluator.violated(order).iter().all(|stop| late.contains(stop)))
            {
                return Pass::Improved(candidate);
            }
            order[i..=j].reverse();
        }
    }
    Pass::LocalOptimum
}
