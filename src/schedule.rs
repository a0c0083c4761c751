//! Route evaluation.
//!
//! Walks an ordering of stop indices from the driver's origin, waiting for
//! window starts, and accumulates distance, duration, weighted cost and the
//! stops whose window end is missed.

use crate::config::CostWeights;
use crate::matrix::TravelMatrix;
use crate::model::{Leg, RouteTotals, Stop};

/// Tolerance for cost comparisons.
pub const COST_EPSILON: f64 = 1e-9;

/// Ranking key: fewer window violations first, then lower cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub violations: usize,
    pub cost: f64,
}

impl Score {
    pub const WORST: Score = Score {
        violations: usize::MAX,
        cost: f64::INFINITY,
    };

    pub fn is_better_than(&self, other: &Score) -> bool {
        self.violations < other.violations
            || (self.violations == other.violations && self.cost < other.cost - COST_EPSILON)
    }

    pub fn penalized(&self, violation_penalty: f64) -> f64 {
        self.cost + self.violations as f64 * violation_penalty
    }
}

/// Timing of one visit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visit {
    pub leg: Leg,
    pub arrival: f64,
    pub service_start: f64,
    pub departure: f64,
    pub late: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    /// Same order as the evaluated ordering.
    pub visits: Vec<Visit>,
    /// Stop indices whose window end was missed.
    pub violated: Vec<usize>,
    pub totals: RouteTotals,
}

impl Schedule {
    pub fn score(&self) -> Score {
        Score {
            violations: self.violated.len(),
            cost: self.totals.cost,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    matrix: &'a TravelMatrix,
    stops: &'a [Stop],
    weights: CostWeights,
    departure: f64,
}

impl<'a> Evaluator<'a> {
    pub fn new(matrix: &'a TravelMatrix, stops: &'a [Stop], weights: CostWeights, departure: f64) -> Self {
        Self {
            matrix,
            stops,
            weights,
            departure,
        }
    }

    pub fn stops(&self) -> &'a [Stop] {
        self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn departure(&self) -> f64 {
        self.departure
    }

    pub fn weights(&self) -> &CostWeights {
        &self.weights
    }

    /// Travel from `from_node` (0 = origin) at `time` and serve `stop`.
    pub fn visit(&self, from_node: usize, time: f64, stop: usize) -> Visit {
        let leg = self.matrix.leg(from_node, stop + 1);
        let arrival = time + leg.duration;
        let target = &self.stops[stop];
        let (service_start, late) = match target.window() {
            Some(window) => (arrival.max(window.start), arrival > window.end + COST_EPSILON),
            None => (arrival, false),
        };
        Visit {
            leg,
            arrival,
            service_start,
            departure: service_start + target.service_duration(),
            late,
        }
    }

    /// Cost contributed by `visit` when starting from `time`.
    pub fn visit_cost(&self, stop: usize, time: f64, visit: &Visit) -> f64 {
        let delay = (visit.service_start - self.departure) * self.stops[stop].priority().delay_factor();
        self.weights.distance * visit.leg.distance
            + self.weights.duration * (visit.departure - time)
            + self.weights.priority_delay * delay
    }

    pub fn evaluate(&self, order: &[usize]) -> Schedule {
        let mut visits = Vec::with_capacity(order.len());
        let mut violated = Vec::new();
        let totals = self.walk(order, |stop, visit| {
            if visit.late {
                violated.push(stop);
            }
            visits.push(*visit);
        });
        Schedule {
            visits,
            violated,
            totals,
        }
    }

    /// Same ranking as `evaluate(order).score()` without allocating.
    pub fn score(&self, order: &[usize]) -> Score {
        let mut violations = 0;
        let totals = self.walk(order, |_, visit| {
            if visit.late {
                violations += 1;
            }
        });
        Score {
            violations,
            cost: totals.cost,
        }
    }

    /// Stops that miss their window, in visit order.
    pub fn violated(&self, order: &[usize]) -> Vec<usize> {
        let mut late = Vec::new();
        self.walk(order, |stop, visit| {
            if visit.late {
                late.push(stop);
            }
        });
        late
    }

    fn walk(&self, order: &[usize], mut on_visit: impl FnMut(usize, &Visit)) -> RouteTotals {
        let mut node = 0;
        let mut time = self.departure;
        let mut distance = 0.0;
        let mut cost = 0.0;
        for &stop in order {
            let visit = self.visit(node, time, stop);
            cost += self.visit_cost(stop, time, &visit);
            distance += visit.leg.distance;
            on_visit(stop, &visit);
            time = visit.departure;
            node = stop + 1;
        }
        RouteTotals {
            distance,
            duration: time - self.departure,
            cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, Priority};
    use crate::planar::EuclideanCostModel;

    fn line_stops() -> Vec<Stop> {
        vec![
            Stop::new("a", (1.0, 0.0)).with_service_duration(10.0),
            Stop::new("b", (2.0, 0.0)).with_window(50.0, 60.0),
        ]
    }

    #[test]
    fn test_waits_for_window_start() {
        let stops = line_stops();
        let matrix = TravelMatrix::build(Coordinate::new(0.0, 0.0), &stops, &EuclideanCostModel::default()).unwrap();
        let evaluator = Evaluator::new(&matrix, &stops, CostWeights::default(), 0.0);

        let schedule = evaluator.evaluate(&[0, 1]);
        assert_eq!(schedule.visits[0].departure, 11.0);
        assert_eq!(schedule.visits[1].arrival, 12.0);
        assert_eq!(schedule.visits[1].service_start, 50.0);
        assert_eq!(schedule.totals.distance, 2.0);
        assert_eq!(schedule.totals.duration, 50.0);
        assert!(schedule.violated.is_empty());
    }

    #[test]
    fn test_late_arrival_is_violation() {
        let stops = line_stops();
        let matrix = TravelMatrix::build(Coordinate::new(0.0, 0.0), &stops, &EuclideanCostModel::default()).unwrap();
        let evaluator = Evaluator::new(&matrix, &stops, CostWeights::default(), 59.5);

        let schedule = evaluator.evaluate(&[0, 1]);
        assert_eq!(schedule.violated, vec![1]);
        assert_eq!(evaluator.score(&[0, 1]), schedule.score());
    }

    #[test]
    fn test_priority_delay_weighting() {
        let stops = vec![
            Stop::new("low", (1.0, 0.0)).with_priority(Priority::Low),
            Stop::new("urgent", (2.0, 0.0)).with_priority(Priority::Urgent),
        ];
        let matrix = TravelMatrix::build(Coordinate::new(0.0, 0.0), &stops, &EuclideanCostModel::default()).unwrap();
        let weights = CostWeights {
            distance: 0.0,
            priority_delay: 1.0,
            ..CostWeights::default()
        };
        let evaluator = Evaluator::new(&matrix, &stops, weights, 0.0);

        // low served at 1 (x0.5), urgent at 2 (x4)
        assert_eq!(evaluator.score(&[0, 1]).cost, 0.5 + 8.0);
        // urgent served at 2 (x4), low at 3 (x0.5)
        assert_eq!(evaluator.score(&[1, 0]).cost, 8.0 + 1.5);
    }

    #[test]
    fn test_score_ordering() {
        let feasible = Score { violations: 0, cost: 100.0 };
        let late = Score { violations: 1, cost: 1.0 };
        assert!(feasible.is_better_than(&late));
        assert!(!late.is_better_than(&feasible));
        assert!(!feasible.is_better_than(&feasible));
    }
}
