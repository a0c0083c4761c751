//! Exhaustive permutation search for small stop sets.

use crate::budget::SearchBudget;
use crate::error::OptimizeError;
use crate::schedule::Evaluator;
use crate::strategy::SearchOutcome;

/// Permutations evaluated between budget checks.
const CHECK_INTERVAL: usize = 1024;

pub fn search(evaluator: &Evaluator<'_>, budget: &SearchBudget, limit: usize) -> Result<SearchOutcome, OptimizeError> {
    let n = evaluator.len();
    if n > limit {
        return Err(OptimizeError::TourTooLarge { stops: n, limit });
    }

    let mut permutation: Vec<usize> = (0..n).collect();
    let mut best = permutation.clone();
    let mut best_score = evaluator.score(&permutation);
    let mut evaluated = 1;

    while next_permutation(&mut permutation) {
        if evaluated % CHECK_INTERVAL == 0 {
            if let Some(interrupt) = budget.check() {
                return Ok(SearchOutcome::interrupted(best, interrupt, evaluated));
            }
        }
        let score = evaluator.score(&permutation);
        if score.is_better_than(&best_score) {
            best_score = score;
            best.copy_from_slice(&permutation);
        }
        evaluated += 1;
    }

    Ok(SearchOutcome::finished(best, evaluated))
}

/// Advance to the next lexicographic permutation; false after the last.
fn next_permutation(items: &mut [usize]) -> bool {
    let Some(pivot) = items.windows(2).rposition(|pair| pair[0] < pair[1]) else {
        return false;
    };
    let Some(successor) = items.iter().rposition(|&item| item > items[pivot]) else {
        return false;
    };
    items.swap(pivot, successor);
    items[pivot + 1..].reverse();
    true
}
