//! Test fixtures for route-optimizer.
//!
//! Provides:
//! - Real Las Vegas / Henderson delivery addresses (from OpenStreetMap)
//! - Builders for drivers, stops and grid layouts

#![allow(dead_code)]

pub mod las_vegas_deliveries;

pub use las_vegas_deliveries::*;

use route_optimizer::{DriverPosition, Stop};

/// Driver at the planar origin, clock at zero.
pub fn driver_at_origin() -> DriverPosition {
    DriverPosition::new("driver-1", (0.0, 0.0), 0.0)
}

/// Stops on a planar grid, ids `s00`, `s01`, ... so id order is input order.
pub fn scattered_stops(count: usize) -> Vec<Stop> {
    (0..count)
        .map(|i| {
            // Deterministic but irregular layout.
            let x = ((i * 37 + 11) % 23) as f64 - 11.0;
            let y = ((i * 53 + 7) % 19) as f64 - 9.0;
            Stop::new(format!("s{i:02}"), (x, y))
        })
        .collect()
}

pub fn stop_ids(route: &route_optimizer::Route) -> Vec<String> {
    route.stop_ids().into_iter().map(|id| id.to_string()).collect()
}

pub fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}
