//! Optimizer tuning parameters.
//!
//! Every field has a documented default; none of them encodes business rules,
//! they only trade search effort against route quality.

use serde::{Deserialize, Serialize};

/// Weights turning distance, time and priority delay into one cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    /// Cost per distance unit.
    pub distance: f64,
    /// Cost per second of route duration.
    pub duration: f64,
    /// Cost per second a stop waits for service, scaled by its priority.
    pub priority_delay: f64,
    /// Fuel per distance unit, used for savings reports.
    pub fuel_per_distance: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            distance: 1.0,
            duration: 0.0,
            priority_delay: 0.0,
            fuel_per_distance: 0.0001, // ~10 l / 100 km with metre distances
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwoOptConfig {
    /// Maximum accepted improving moves.
    pub max_iterations: usize,
}

impl Default for TwoOptConfig {
    fn default() -> Self {
        Self { max_iterations: 1000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Stop early after this many generations without a better tour.
    pub stall_generations: usize,
    /// Probability of a segment-swap mutation per child.
    pub mutation_rate: f64,
    /// Best individuals copied unchanged into the next generation.
    pub elite_count: usize,
    pub tournament_size: usize,
    /// Used when the request does not supply a seed.
    pub seed: u64,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 64,
            generations: 400,
            stall_generations: 60,
            mutation_rate: 0.25,
            elite_count: 2,
            tournament_size: 3,
            seed: 0x5EED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub weights: CostWeights,
    pub two_opt: TwoOptConfig,
    pub genetic: GeneticConfig,
    /// Largest stop count brute force accepts.
    pub brute_force_limit: usize,
    /// Relative regression of cheapest insertion that triggers a full run.
    pub fallback_regression: f64,
    /// Two-opt moves allowed when polishing an incremental edit.
    pub polish_iterations: usize,
    /// Cost added per window violation when ranking tours.
    pub violation_penalty: f64,
    /// Most marginal stops considered for alternative routes.
    pub max_alternative_candidates: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            weights: CostWeights::default(),
            two_opt: TwoOptConfig::default(),
            genetic: GeneticConfig::default(),
            brute_force_limit: 8,
            fallback_regression: 0.2,
            polish_iterations: 200,
            violation_penalty: 1e6,
            max_alternative_candidates: 6,
        }
    }
}
