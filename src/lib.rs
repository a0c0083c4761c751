//! Delivery route optimizer
//!
//! Orders a driver's pending delivery stops with one of several search
//! strategies, re-optimizes routes incrementally and reports alternatives.

pub mod budget;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod haversine;
pub mod matrix;
pub mod model;
pub mod osrm;
pub mod planar;
pub mod schedule;
pub mod solver;
pub mod strategy;
pub mod traffic;
pub mod traits;

pub use budget::{CancellationToken, SearchBudget};
pub use config::OptimizerConfig;
pub use error::{CostModelError, OptimizeError, TableError};
pub use model::{AlternativeRoute, Coordinate, DriverPosition, Priority, Route, RouteStatus, Stop, StopId};
pub use solver::{OptimizeRequest, RouteOptimizer};
pub use strategy::Algorithm;
pub use traits::CostModel;
