//! Route search strategies.
//!
//! Every strategy shares one contract: given an [`Evaluator`] over the
//! requested stops and a [`SearchBudget`], return an ordering of stop
//! indices. Interrupted searches return the best ordering found so far.

pub mod brute_force;
pub mod genetic;
pub mod nearest_neighbor;
pub mod two_opt;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::budget::{Interrupt, SearchBudget};
use crate::config::OptimizerConfig;
use crate::error::OptimizeError;
use crate::schedule::Evaluator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    NearestNeighbor,
    TwoOpt,
    Genetic,
    BruteForce,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::NearestNeighbor,
        Algorithm::TwoOpt,
        Algorithm::Genetic,
        Algorithm::BruteForce,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::NearestNeighbor => "NEAREST_NEIGHBOR",
            Algorithm::TwoOpt => "TWO_OPT",
            Algorithm::Genetic => "GENETIC",
            Algorithm::BruteForce => "BRUTE_FORCE",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub String);

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown algorithm: {}", self.0)
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

/// Result of one strategy run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Stop indices in visiting order; always a full permutation.
    pub order: Vec<usize>,
    /// Set when the budget cut the search short.
    pub interrupted: Option<Interrupt>,
    pub iterations: usize,
}

impl SearchOutcome {
    pub fn finished(order: Vec<usize>, iterations: usize) -> Self {
        Self {
            order,
            interrupted: None,
            iterations,
        }
    }

    pub fn interrupted(order: Vec<usize>, interrupt: Interrupt, iterations: usize) -> Self {
        Self {
            order,
            interrupted: Some(interrupt),
            iterations,
        }
    }
}

pub(crate) fn run(
    algorithm: Algorithm,
    evaluator: &Evaluator<'_>,
    budget: &SearchBudget,
    config: &OptimizerConfig,
    seed: u64,
) -> Result<SearchOutcome, OptimizeError> {
    let outcome = match algorithm {
        Algorithm::NearestNeighbor => nearest_neighbor::search(evaluator, budget),
        Algorithm::TwoOpt => two_opt::search(evaluator, budget, &config.two_opt),
        Algorithm::Genetic => genetic::search(evaluator, budget, &config.genetic, config.violation_penalty, seed),
        Algorithm::BruteForce => brute_force::search(evaluator, budget, config.brute_force_limit)?,
    };
    tracing::debug!(
        %algorithm,
        iterations = outcome.iterations,
        interrupted = ?outcome.interrupted,
        "search finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.to_string().parse::<Algorithm>(), Ok(algorithm));
        }
        assert_eq!("two_opt".parse::<Algorithm>(), Ok(Algorithm::TwoOpt));
        assert!("SIMULATED_ANNEALING".parse::<Algorithm>().is_err());
    }
}
