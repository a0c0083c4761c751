//! Error types for route optimization.

use std::fmt;

use thiserror::Error;

use crate::model::StopId;

/// Failure reported by an injected [`crate::traits::CostModel`].
#[derive(Debug, Error)]
pub enum CostModelError {
    #[error("routing request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no route between coordinates")]
    NoRoute,
    #[error("{0}")]
    Other(String),
}

/// Failure while filling a whole travel table.
///
/// Indices refer to the `locations` slice passed to
/// [`crate::traits::CostModel::table`].
#[derive(Debug, Error)]
pub enum TableError {
    #[error("no leg from location {from} to location {to}")]
    Leg {
        from: usize,
        to: usize,
        #[source]
        source: CostModelError,
    },
    #[error("travel table request failed")]
    Table(#[source] CostModelError),
}

/// One end of a travel leg, used to locate cost model failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Waypoint {
    Origin,
    Stop(StopId),
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waypoint::Origin => f.write_str("origin"),
            Waypoint::Stop(id) => write!(f, "stop {id}"),
        }
    }
}

/// The constraint a stop broke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Violation {
    /// Window end precedes window start.
    TimeWindow,
    /// The stop id appears more than once.
    DuplicateStop,
    MaxStops(usize),
    MaxDistance(f64),
    MaxDuration(f64),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::TimeWindow => f.write_str("time window ends before it starts"),
            Violation::DuplicateStop => f.write_str("duplicate stop id"),
            Violation::MaxStops(cap) => write!(f, "more than {cap} stops"),
            Violation::MaxDistance(cap) => write!(f, "total distance above {cap}"),
            Violation::MaxDuration(cap) => write!(f, "total duration above {cap}s"),
        }
    }
}

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("at least one stop is required")]
    EmptyStopSet,
    #[error("stop {stop} violates constraint: {constraint}")]
    ConstraintViolation { stop: StopId, constraint: Violation },
    #[error("brute force supports at most {limit} stops, got {stops}")]
    TourTooLarge { stops: usize, limit: usize },
    #[error("optimization cancelled before any tour was found")]
    Cancelled,
    #[error("cost model failed between {from} and {to}")]
    CostModel {
        from: Waypoint,
        to: Waypoint,
        #[source]
        source: CostModelError,
    },
    #[error("cost model could not build the travel matrix")]
    CostMatrix(#[source] CostModelError),
    #[error("stop {0} is not on the route")]
    UnknownStop(StopId),
}
