//! Data model for delivery route optimization.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::strategy::Algorithm;

/// A geographic coordinate (lat, lng).
///
/// Planar cost models read `lat` as `x` and `lng` as `y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        Coordinate::new((self.lat + other.lat) / 2.0, (self.lng + other.lng) / 2.0)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Delivery stop identifier. Ordered lexicographically for tie-breaks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StopId(String);

impl StopId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StopId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverId(String);

impl DriverId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Earliest/latest arrival, in seconds on the driver position clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.end >= self.start
    }
}

/// Priority tier for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Multiplier applied to the delay before this stop is served.
    pub fn delay_factor(self) -> f64 {
        match self {
            Priority::Low => 0.5,
            Priority::Normal => 1.0,
            Priority::High => 2.0,
            Priority::Urgent => 4.0,
        }
    }
}

/// A single delivery destination.
///
/// Stops are immutable once built; the builder methods consume `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    id: StopId,
    location: Coordinate,
    window: Option<TimeWindow>,
    priority: Priority,
    service_duration: f64,
}

impl Stop {
    pub fn new(id: impl Into<String>, location: impl Into<Coordinate>) -> Self {
        Self {
            id: StopId::new(id),
            location: location.into(),
            window: None,
            priority: Priority::Normal,
            service_duration: 0.0,
        }
    }

    pub fn with_window(mut self, start: f64, end: f64) -> Self {
        self.window = Some(TimeWindow::new(start, end));
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Estimated time spent at the stop, in seconds.
    pub fn with_service_duration(mut self, seconds: f64) -> Self {
        self.service_duration = seconds;
        self
    }

    pub fn id(&self) -> &StopId {
        &self.id
    }

    pub fn location(&self) -> Coordinate {
        self.location
    }

    pub fn window(&self) -> Option<TimeWindow> {
        self.window
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn service_duration(&self) -> f64 {
        self.service_duration
    }
}

/// Current driver location, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverPosition {
    pub driver_id: DriverId,
    pub location: Coordinate,
    /// Seconds, same clock as stop time windows.
    pub timestamp: f64,
}

impl DriverPosition {
    pub fn new(driver_id: impl Into<String>, location: impl Into<Coordinate>, timestamp: f64) -> Self {
        Self {
            driver_id: DriverId::new(driver_id),
            location: location.into(),
            timestamp,
        }
    }
}

/// Travel between two coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Leg {
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
}

impl Leg {
    pub const ZERO: Leg = Leg {
        distance: 0.0,
        duration: 0.0,
    };

    pub const fn new(distance: f64, duration: f64) -> Self {
        Self { distance, duration }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteTotals {
    pub distance: f64,
    /// Departure to the end of the last service, waits included.
    pub duration: f64,
    pub cost: f64,
}

/// Improvement of a route over its baseline ordering. Negative means worse.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Savings {
    pub distance: f64,
    pub duration: f64,
    pub fuel: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStop {
    pub stop: Stop,
    /// Travel from the previous stop (or the origin).
    pub leg: Leg,
    pub arrival: f64,
    pub service_start: f64,
    pub departure: f64,
    /// Arrival falls after the stop's window end.
    pub priority_violated: bool,
}

/// How a route snapshot was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteMethod {
    Full,
    CheapestInsertion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteStatus {
    Completed,
    Infeasible,
    Cancelled,
}

/// Optional caps on an optimized route.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteConstraints {
    pub max_stops: Option<usize>,
    pub max_distance: Option<f64>,
    pub max_duration: Option<f64>,
}

/// An immutable route snapshot for one driver.
///
/// Only the optimizer builds routes; edits produce a new snapshot with a
/// higher version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    driver_id: DriverId,
    version: u64,
    origin: DriverPosition,
    stops: Vec<PlannedStop>,
    totals: RouteTotals,
    algorithm: Algorithm,
    seed: u64,
    method: RouteMethod,
    savings: Savings,
    constraints: RouteConstraints,
    partial: bool,
    status: RouteStatus,
}

/// Fields for [`Route::new`], kept crate-private.
pub(crate) struct RouteParts {
    pub version: u64,
    pub origin: DriverPosition,
    pub stops: Vec<PlannedStop>,
    pub totals: RouteTotals,
    pub algorithm: Algorithm,
    pub seed: u64,
    pub method: RouteMethod,
    pub savings: Savings,
    pub constraints: RouteConstraints,
    pub partial: bool,
    pub status: RouteStatus,
}

impl Route {
    pub(crate) fn new(parts: RouteParts) -> Self {
        Self {
            driver_id: parts.origin.driver_id.clone(),
            version: parts.version,
            origin: parts.origin,
            stops: parts.stops,
            totals: parts.totals,
            algorithm: parts.algorithm,
            seed: parts.seed,
            method: parts.method,
            savings: parts.savings,
            constraints: parts.constraints,
            partial: parts.partial,
            status: parts.status,
        }
    }

    pub fn driver_id(&self) -> &DriverId {
        &self.driver_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn origin(&self) -> &DriverPosition {
        &self.origin
    }

    pub fn stops(&self) -> &[PlannedStop] {
        &self.stops
    }

    pub fn stop_ids(&self) -> Vec<&StopId> {
        self.stops.iter().map(|planned| planned.stop.id()).collect()
    }

    pub fn totals(&self) -> RouteTotals {
        self.totals
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Genetic seed the route was searched with; reused by re-optimization.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn method(&self) -> RouteMethod {
        self.method
    }

    pub fn savings(&self) -> Savings {
        self.savings
    }

    /// Caps carried over to re-optimizations of this route.
    pub fn constraints(&self) -> RouteConstraints {
        self.constraints
    }

    /// Search stopped early (time budget or cancellation); best tour found.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn status(&self) -> RouteStatus {
        self.status
    }

    /// Stops whose window could not be honored.
    pub fn violated_stops(&self) -> Vec<&StopId> {
        self.stops
            .iter()
            .filter(|planned| planned.priority_violated)
            .map(|planned| planned.stop.id())
            .collect()
    }
}

/// A perturbed ordering of an accepted route, with its extra cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeRoute {
    pub stop_ids: Vec<StopId>,
    pub totals: RouteTotals,
    pub extra_distance: f64,
    pub extra_duration: f64,
    pub extra_cost: f64,
    pub violated_stops: Vec<StopId>,
}
