//! Route optimizer: full optimization, incremental re-optimization and
//! alternative routes for a single driver.

use std::collections::HashSet;
use std::time::Duration;

use rayon::prelude::*;

use crate::budget::{Interrupt, SearchBudget};
use crate::config::OptimizerConfig;
use crate::error::{OptimizeError, Violation};
use crate::matrix::TravelMatrix;
use crate::model::{
    AlternativeRoute, DriverPosition, PlannedStop, Route, RouteConstraints, RouteMethod, RouteParts, RouteStatus,
    Savings, Stop, StopId,
};
use crate::schedule::{Evaluator, Schedule, Score};
use crate::strategy::{self, Algorithm, nearest_neighbor, two_opt};
use crate::traits::CostModel;

/// Parameters for one optimization.
#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    pub driver: DriverPosition,
    pub stops: Vec<Stop>,
    pub algorithm: Algorithm,
    pub constraints: RouteConstraints,
    /// Wall-clock limit; the best tour so far is returned on expiry.
    pub time_budget: Option<Duration>,
    /// Genetic seed; falls back to the configured one.
    pub seed: Option<u64>,
}

impl OptimizeRequest {
    pub fn new(driver: DriverPosition, stops: Vec<Stop>, algorithm: Algorithm) -> Self {
        Self {
            driver,
            stops,
            algorithm,
            constraints: RouteConstraints::default(),
            time_budget: None,
            seed: None,
        }
    }

    pub fn with_constraints(mut self, constraints: RouteConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Metadata for assembling a route snapshot.
struct Provenance {
    version: u64,
    algorithm: Algorithm,
    seed: u64,
    method: RouteMethod,
    constraints: RouteConstraints,
    interrupted: Option<Interrupt>,
}

#[derive(Debug, Clone)]
pub struct RouteOptimizer<C> {
    cost_model: C,
    config: OptimizerConfig,
}

impl<C: CostModel> RouteOptimizer<C> {
    pub fn new(cost_model: C) -> Self {
        Self::with_config(cost_model, OptimizerConfig::default())
    }

    pub fn with_config(cost_model: C, config: OptimizerConfig) -> Self {
        Self { cost_model, config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn cost_model(&self) -> &C {
        &self.cost_model
    }

    /// Order `request.stops` starting from the driver's position.
    ///
    /// Window violations do not fail the call: the stops are flagged
    /// `priority_violated` and the route status is `Infeasible`.
    #[tracing::instrument(
        skip_all,
        fields(driver = %request.driver.driver_id, algorithm = %request.algorithm, stops = request.stops.len())
    )]
    pub fn optimize(&self, request: &OptimizeRequest, budget: &SearchBudget) -> Result<Route, OptimizeError> {
        validate_stops(&request.stops)?;
        check_stop_cap(&request.stops, &request.constraints)?;

        let budget = budget.clone().limited_to(request.time_budget);
        if budget.token().is_cancelled() {
            return Err(OptimizeError::Cancelled);
        }

        let (stops, baseline) = by_id(&request.stops);
        let matrix = TravelMatrix::build(request.driver.location, &stops, &self.cost_model)?;
        let evaluator = Evaluator::new(&matrix, &stops, self.config.weights, request.driver.timestamp);
        let seed = request.seed.unwrap_or(self.config.genetic.seed);
        let outcome = strategy::run(request.algorithm, &evaluator, &budget, &self.config, seed)?;

        let route = self.assemble(
            &evaluator,
            &outcome.order,
            &baseline,
            &request.driver,
            Provenance {
                version: 1,
                algorithm: request.algorithm,
                seed,
                method: RouteMethod::Full,
                constraints: request.constraints,
                interrupted: outcome.interrupted,
            },
        );
        check_route_caps(&route, &request.constraints)?;
        log_route(&route);
        Ok(route)
    }

    /// Apply stop edits to `current` from its original origin.
    pub fn reoptimize(
        &self,
        current: &Route,
        added: &[Stop],
        removed: &[StopId],
        budget: &SearchBudget,
    ) -> Result<Route, OptimizeError> {
        self.reoptimize_from(current, current.origin().clone(), added, removed, budget)
    }

    /// Apply stop edits to `current`, starting from a new driver position.
    ///
    /// Removed stops are dropped, remaining stops keep their order and added
    /// stops are placed by cheapest insertion, followed by a short 2-opt
    /// polish. The route's algorithm is then rerun with the route's seed and
    /// the better of the two is kept when either
    ///
    /// - the edit only removed stops, or
    /// - the insertion lands more than `fallback_regression` above a fresh
    ///   nearest-neighbor tour.
    ///
    /// Removing stops therefore never ends up worse than optimizing the
    /// remaining stops from scratch.
    #[tracing::instrument(
        skip_all,
        fields(driver = %current.driver_id(), version = current.version(), added = added.len(), removed = removed.len())
    )]
    pub fn reoptimize_from(
        &self,
        current: &Route,
        position: DriverPosition,
        added: &[Stop],
        removed: &[StopId],
        budget: &SearchBudget,
    ) -> Result<Route, OptimizeError> {
        if let Some(unknown) = removed
            .iter()
            .find(|id| !current.stops().iter().any(|planned| planned.stop.id() == *id))
        {
            return Err(OptimizeError::UnknownStop(unknown.clone()));
        }

        let removed: HashSet<&StopId> = removed.iter().collect();
        let mut edited: Vec<Stop> = current
            .stops()
            .iter()
            .filter(|planned| !removed.contains(planned.stop.id()))
            .map(|planned| planned.stop.clone())
            .collect();
        let kept = edited.len();
        let mut incoming = added.to_vec();
        incoming.sort_by(|a, b| a.id().cmp(b.id()));
        edited.extend(incoming);

        let constraints = current.constraints();
        validate_stops(&edited)?;
        check_stop_cap(&edited, &constraints)?;
        if budget.token().is_cancelled() {
            return Err(OptimizeError::Cancelled);
        }

        let (stops, baseline) = by_id(&edited);
        let matrix = TravelMatrix::build(position.location, &stops, &self.cost_model)?;
        let evaluator = Evaluator::new(&matrix, &stops, self.config.weights, position.timestamp);

        let mut order = baseline[..kept].to_vec();
        for &stop in &baseline[kept..] {
            let at = cheapest_position(&evaluator, &order, stop);
            order.insert(at, stop);
        }
        let polished = two_opt::improve(&evaluator, order, budget, self.config.polish_iterations);
        let mut order = polished.order;
        let mut interrupted = polished.interrupted;
        let mut method = RouteMethod::CheapestInsertion;
        let algorithm = current.algorithm();
        let seed = current.seed();

        if (!added.is_empty() || !removed.is_empty()) && interrupted.is_none() {
            let insertion = evaluator.score(&order);
            let rerun = if added.is_empty() {
                true
            } else {
                let reference = evaluator.score(&nearest_neighbor::search(&evaluator, budget).order);
                let regressed = regressed(&insertion, &reference, self.config.fallback_regression);
                if regressed {
                    tracing::info!(
                        insertion_cost = insertion.cost,
                        reference_cost = reference.cost,
                        "cheapest insertion regressed, recomputing route"
                    );
                }
                regressed
            };

            if rerun {
                let full = strategy::run(self.runnable(algorithm, stops.len()), &evaluator, budget, &self.config, seed)?;
                let rerun_score = evaluator.score(&full.order);
                tracing::debug!(insertion_cost = insertion.cost, rerun_cost = rerun_score.cost, "full rerun finished");
                if rerun_score.is_better_than(&insertion) {
                    order = full.order;
                    interrupted = full.interrupted;
                    method = RouteMethod::Full;
                }
            }
        }

        let route = self.assemble(
            &evaluator,
            &order,
            &baseline,
            &position,
            Provenance {
                version: current.version() + 1,
                algorithm,
                seed,
                method,
                constraints,
                interrupted,
            },
        );
        check_route_caps(&route, &constraints)?;
        log_route(&route);
        Ok(route)
    }

    /// Up to `k` perturbations of `route`, cheapest extra cost first.
    ///
    /// Candidates swap pairs among the stops with the highest marginal cost,
    /// then adjacent stops. The primary ordering itself is never returned.
    #[tracing::instrument(skip_all, fields(driver = %route.driver_id(), version = route.version(), k = k))]
    pub fn alternatives(&self, route: &Route, k: usize) -> Result<Vec<AlternativeRoute>, OptimizeError> {
        let n = route.stops().len();
        if k == 0 || n < 2 {
            return Ok(Vec::new());
        }

        let stops: Vec<Stop> = route.stops().iter().map(|planned| planned.stop.clone()).collect();
        let origin = route.origin();
        let matrix = TravelMatrix::build(origin.location, &stops, &self.cost_model)?;
        let evaluator = Evaluator::new(&matrix, &stops, self.config.weights, origin.timestamp);

        let primary: Vec<usize> = (0..n).collect();
        let primary_totals = evaluator.evaluate(&primary).totals;

        let mut marginal: Vec<(usize, f64)> = (0..n)
            .map(|position| {
                let mut without = primary.clone();
                without.remove(position);
                (position, primary_totals.cost - evaluator.score(&without).cost)
            })
            .collect();
        marginal.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let top: Vec<usize> = marginal
            .iter()
            .take(self.config.max_alternative_candidates.max(2))
            .map(|(position, _)| *position)
            .collect();

        let mut swaps: Vec<(usize, usize)> = Vec::new();
        for (i, &a) in top.iter().enumerate() {
            for &b in &top[i + 1..] {
                swaps.push((a, b));
            }
        }
        swaps.extend((0..n - 1).map(|position| (position, position + 1)));

        let mut seen: HashSet<Vec<usize>> = HashSet::from([primary.clone()]);
        let candidates: Vec<Vec<usize>> = swaps
            .into_iter()
            .filter_map(|(a, b)| {
                let mut order = primary.clone();
                order.swap(a, b);
                seen.insert(order.clone()).then_some(order)
            })
            .collect();

        let mut alternatives: Vec<AlternativeRoute> = candidates
            .into_par_iter()
            .map(|order| {
                let schedule = evaluator.evaluate(&order);
                AlternativeRoute {
                    stop_ids: order.iter().map(|&i| stops[i].id().clone()).collect(),
                    extra_distance: schedule.totals.distance - primary_totals.distance,
                    extra_duration: schedule.totals.duration - primary_totals.duration,
                    extra_cost: schedule.totals.cost - primary_totals.cost,
                    violated_stops: schedule.violated.iter().map(|&i| stops[i].id().clone()).collect(),
                    totals: schedule.totals,
                }
            })
            .collect();

        alternatives.sort_by(|a, b| {
            a.extra_cost
                .total_cmp(&b.extra_cost)
                .then(a.extra_distance.total_cmp(&b.extra_distance))
        });
        alternatives.truncate(k);
        tracing::debug!(found = alternatives.len(), "alternative routes ranked");
        Ok(alternatives)
    }

    /// Brute force past its limit is swapped for 2-opt; the route keeps its
    /// requested algorithm so a later, smaller edit can run it again.
    fn runnable(&self, algorithm: Algorithm, stops: usize) -> Algorithm {
        if algorithm == Algorithm::BruteForce && stops > self.config.brute_force_limit {
            Algorithm::TwoOpt
        } else {
            algorithm
        }
    }

    fn assemble(
        &self,
        evaluator: &Evaluator<'_>,
        order: &[usize],
        baseline: &[usize],
        origin: &DriverPosition,
        provenance: Provenance,
    ) -> Route {
        let schedule = evaluator.evaluate(order);
        let baseline = evaluator.evaluate(baseline).totals;
        let stops = evaluator.stops();

        let planned = planned_stops(stops, order, &schedule);
        let status = match provenance.interrupted {
            Some(Interrupt::Cancelled) => RouteStatus::Cancelled,
            _ if !schedule.violated.is_empty() => RouteStatus::Infeasible,
            _ => RouteStatus::Completed,
        };
        let distance_saved = baseline.distance - schedule.totals.distance;

        Route::new(RouteParts {
            version: provenance.version,
            origin: origin.clone(),
            stops: planned,
            totals: schedule.totals,
            algorithm: provenance.algorithm,
            seed: provenance.seed,
            method: provenance.method,
            savings: Savings {
                distance: distance_saved,
                duration: baseline.duration - schedule.totals.duration,
                fuel: distance_saved * self.config.weights.fuel_per_distance,
                cost: baseline.cost - schedule.totals.cost,
            },
            constraints: provenance.constraints,
            partial: provenance.interrupted.is_some(),
            status,
        })
    }
}

fn planned_stops(stops: &[Stop], order: &[usize], schedule: &Schedule) -> Vec<PlannedStop> {
    order
        .iter()
        .zip(&schedule.visits)
        .map(|(&stop, visit)| PlannedStop {
            stop: stops[stop].clone(),
            leg: visit.leg,
            arrival: visit.arrival,
            service_start: visit.service_start,
            departure: visit.departure,
            priority_violated: visit.late,
        })
        .collect()
}

/// Reject empty sets, duplicate ids and inverted windows.
fn validate_stops(stops: &[Stop]) -> Result<(), OptimizeError> {
    if stops.is_empty() {
        return Err(OptimizeError::EmptyStopSet);
    }
    let mut seen = HashSet::with_capacity(stops.len());
    for stop in stops {
        if !seen.insert(stop.id()) {
            return Err(violation(stop, Violation::DuplicateStop));
        }
        if stop.window().is_some_and(|window| !window.is_valid()) {
            return Err(violation(stop, Violation::TimeWindow));
        }
    }
    Ok(())
}

/// Stops sorted by id, and the input order as indices into that list.
///
/// Searches run over the sorted list so the result does not depend on the
/// order stops were submitted or kept in. Ids must already be unique.
fn by_id(stops: &[Stop]) -> (Vec<Stop>, Vec<usize>) {
    let mut sorted: Vec<usize> = (0..stops.len()).collect();
    sorted.sort_by(|&a, &b| stops[a].id().cmp(stops[b].id()));
    let mut input_order = vec![0; stops.len()];
    for (position, &original) in sorted.iter().enumerate() {
        input_order[original] = position;
    }
    (sorted.into_iter().map(|i| stops[i].clone()).collect(), input_order)
}

fn check_stop_cap(stops: &[Stop], constraints: &RouteConstraints) -> Result<(), OptimizeError> {
    match constraints.max_stops {
        Some(cap) if stops.len() > cap => Err(violation(&stops[cap], Violation::MaxStops(cap))),
        _ => Ok(()),
    }
}

/// Name the first stop at which cumulative distance or duration passes its cap.
fn check_route_caps(route: &Route, constraints: &RouteConstraints) -> Result<(), OptimizeError> {
    let start = route.origin().timestamp;
    let mut distance = 0.0;
    for planned in route.stops() {
        distance += planned.leg.distance;
        if let Some(cap) = constraints.max_distance {
            if distance > cap {
                return Err(violation(&planned.stop, Violation::MaxDistance(cap)));
            }
        }
        if let Some(cap) = constraints.max_duration {
            if planned.departure - start > cap {
                return Err(violation(&planned.stop, Violation::MaxDuration(cap)));
            }
        }
    }
    Ok(())
}

fn violation(stop: &Stop, constraint: Violation) -> OptimizeError {
    OptimizeError::ConstraintViolation {
        stop: stop.id().clone(),
        constraint,
    }
}

/// Position in `order` where inserting `stop` ranks best; earliest on ties.
fn cheapest_position(evaluator: &Evaluator<'_>, order: &[usize], stop: usize) -> usize {
    let mut candidate = Vec::with_capacity(order.len() + 1);
    let mut best = (0, Score::WORST);
    for position in 0..=order.len() {
        candidate.clear();
        candidate.extend_from_slice(&order[..position]);
        candidate.push(stop);
        candidate.extend_from_slice(&order[position..]);
        let score = evaluator.score(&candidate);
        if score.is_better_than(&best.1) {
            best = (position, score);
        }
    }
    best.0
}

fn regressed(insertion: &Score, reference: &Score, threshold: f64) -> bool {
    insertion.violations > reference.violations
        || (insertion.violations == reference.violations
            && insertion.cost > reference.cost + reference.cost.abs() * threshold)
}

fn log_route(route: &Route) {
    let totals = route.totals();
    if route.is_partial() {
        tracing::warn!(status = ?route.status(), cost = totals.cost, "returning best route found before interruption");
    }
    tracing::info!(
        version = route.version(),
        status = ?route.status(),
        method = ?route.method(),
        distance = totals.distance,
        duration = totals.duration,
        cost = totals.cost,
        saved = route.savings().cost,
        violated = route.violated_stops().len(),
        "route ready"
    );
}
