//! Genetic search over stop permutations.
//!
//! The population is seeded with the nearest-neighbor tour plus random
//! shuffles. Each generation keeps the elite, then breeds children with
//! tournament selection, ordered crossover (OX1) and segment-swap mutation.
//! All randomness comes from one seeded ChaCha stream consumed on a single
//! thread; only scoring runs in parallel, so a seed fully determines the
//! result.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::budget::SearchBudget;
use crate::config::GeneticConfig;
use crate::schedule::{Evaluator, Score};
use crate::strategy::{SearchOutcome, nearest_neighbor};

/// Individuals created between budget checks.
const CHUNK_SIZE: usize = 256;

#[derive(Debug, Clone)]
struct Individual {
    order: Vec<usize>,
    score: Score,
    fitness: f64,
}

impl Individual {
    fn scored(evaluator: &Evaluator<'_>, order: Vec<usize>, violation_penalty: f64) -> Self {
        let score = evaluator.score(&order);
        Self {
            fitness: 1.0 / (1.0 + score.penalized(violation_penalty)),
            order,
            score,
        }
    }
}

pub fn search(
    evaluator: &Evaluator<'_>,
    budget: &SearchBudget,
    config: &GeneticConfig,
    violation_penalty: f64,
    seed: u64,
) -> SearchOutcome {
    let initial = nearest_neighbor::search(evaluator, budget);
    if initial.interrupted.is_some() || evaluator.len() < 2 {
        return initial;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let population_size = config.population_size.max(2);
    let elite_count = config.elite_count.min(population_size - 1);
    let tournament_size = config.tournament_size.max(1);

    let mut best = Individual::scored(evaluator, initial.order, violation_penalty);
    let mut population = vec![best.clone()];

    while population.len() < population_size {
        if let Some(interrupt) = budget.check() {
            tracing::debug!(built = population.len(), "budget hit while seeding population");
            return SearchOutcome::interrupted(best.order, interrupt, 0);
        }
        let count = CHUNK_SIZE.min(population_size - population.len());
        let orders: Vec<Vec<usize>> = (0..count)
            .map(|_| {
                let mut order = best.order.clone();
                order.shuffle(&mut rng);
                order
            })
            .collect();
        let scored = score_all(evaluator, orders, violation_penalty);
        keep_best(&mut best, &scored);
        population.extend(scored);
    }

    let mut stalled = 0;
    for generation in 0..config.generations {
        if let Some(interrupt) = budget.check() {
            return SearchOutcome::interrupted(best.order, interrupt, generation);
        }

        population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        let mut next: Vec<Individual> = population[..elite_count].to_vec();

        while next.len() < population_size {
            if let Some(interrupt) = budget.check() {
                return SearchOutcome::interrupted(best.order, interrupt, generation);
            }
            let count = CHUNK_SIZE.min(population_size - next.len());
            let children: Vec<Vec<usize>> = (0..count)
                .map(|_| {
                    let first = tournament(&population, tournament_size, &mut rng);
                    let second = tournament(&population, tournament_size, &mut rng);
                    let mut child = ordered_crossover(&first.order, &second.order, &mut rng);
                    if rng.gen_bool(config.mutation_rate.clamp(0.0, 1.0)) {
                        segment_swap(&mut child, &mut rng);
                    }
                    child
                })
                .collect();
            next.extend(score_all(evaluator, children, violation_penalty));
        }
        population = next;

        if keep_best(&mut best, &population) {
            tracing::trace!(generation, cost = best.score.cost, "genetic improvement");
            stalled = 0;
        } else {
            stalled += 1;
            if stalled >= config.stall_generations {
                tracing::debug!(generation, "genetic search stalled");
                return SearchOutcome::finished(best.order, generation + 1);
            }
        }
    }

    SearchOutcome::finished(best.order, config.generations)
}

fn score_all(evaluator: &Evaluator<'_>, orders: Vec<Vec<usize>>, violation_penalty: f64) -> Vec<Individual> {
    orders
        .into_par_iter()
        .map(|order| Individual::scored(evaluator, order, violation_penalty))
        .collect()
}

/// Replace `best` with the first strictly better individual. Returns true on change.
fn keep_best(best: &mut Individual, candidates: &[Individual]) -> bool {
    let mut improved = false;
    for candidate in candidates {
        if candidate.score.is_better_than(&best.score) {
            *best = candidate.clone();
            improved = true;
        }
    }
    improved
}

fn tournament<'p>(population: &'p [Individual], size: usize, rng: &mut ChaCha8Rng) -> &'p Individual {
    let mut winner = &population[rng.gen_range(0..population.len())];
    for _ in 1..size {
        let challenger = &population[rng.gen_range(0..population.len())];
        if challenger.fitness > winner.fitness {
            winner = challenger;
        }
    }
    winner
}

/// OX1: copy a slice from `first`, fill the rest in `second`'s order.
fn ordered_crossover(first: &[usize], second: &[usize], rng: &mut ChaCha8Rng) -> Vec<usize> {
    let n = first.len();
    let (mut lo, mut hi) = (rng.gen_range(0..n), rng.gen_range(0..n));
    if lo > hi {
        std::mem::swap(&mut lo, &mut hi);
    }

    let mut child = vec![usize::MAX; n];
    let mut taken = vec![false; n];
    for i in lo..=hi {
        child[i] = first[i];
        taken[first[i]] = true;
    }

    let mut position = (hi + 1) % n;
    for offset in 0..n {
        let gene = second[(hi + 1 + offset) % n];
        if !taken[gene] {
            child[position] = gene;
            taken[gene] = true;
            position = (position + 1) % n;
        }
    }
    child
}

/// Swap two random, non-overlapping, equal-length segments.
fn segment_swap(order: &mut [usize], rng: &mut ChaCha8Rng) {
    let n = order.len();
    if n < 2 {
        return;
    }
    let len = rng.gen_range(1..=n / 2);
    let first = rng.gen_range(0..=n - 2 * len);
    let second = rng.gen_range(first + len..=n - len);
    for offset in 0..len {
        order.swap(first + offset, second + offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_permutation(order: &[usize], n: usize) -> bool {
        let mut sorted = order.to_vec();
        sorted.sort_unstable();
        sorted == (0..n).collect::<Vec<_>>()
    }

    #[test]
    fn test_ordered_crossover_yields_permutations() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let first: Vec<usize> = (0..9).collect();
        let second: Vec<usize> = (0..9).rev().collect();
        for _ in 0..200 {
            let child = ordered_crossover(&first, &second, &mut rng);
            assert!(is_permutation(&child, 9), "not a permutation: {child:?}");
        }
    }

    #[test]
    fn test_segment_swap_preserves_permutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for n in 2..12 {
            let mut order: Vec<usize> = (0..n).collect();
            for _ in 0..50 {
                segment_swap(&mut order, &mut rng);
                assert!(is_permutation(&order, n));
            }
        }
    }

    #[test]
    fn test_ordered_crossover_of_identical_parents() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let parent = vec![4, 2, 0, 3, 1];
        assert_eq!(ordered_crossover(&parent, &parent, &mut rng), parent);
    }
}
