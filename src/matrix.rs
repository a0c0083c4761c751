//! Per-run travel matrix.
//!
//! Node 0 is the driver's origin, node `i + 1` is stop `i`. Coordinates are
//! deduplicated and the cost model is asked for one table over the unique
//! locations, so each ordered pair is priced at most once.

use std::collections::HashMap;

use crate::error::{OptimizeError, TableError, Waypoint};
use crate::model::{Coordinate, Leg, Stop};
use crate::traits::CostModel;

#[derive(Debug, Clone)]
pub struct TravelMatrix {
    /// Node index -> unique location index.
    node_location: Vec<usize>,
    /// Legs between unique locations.
    legs: Vec<Vec<Leg>>,
}

impl TravelMatrix {
    pub fn build<C>(origin: Coordinate, stops: &[Stop], cost_model: &C) -> Result<Self, OptimizeError>
    where
        C: CostModel + ?Sized,
    {
        let mut nodes = Vec::with_capacity(stops.len() + 1);
        nodes.push(origin);
        nodes.extend(stops.iter().map(Stop::location));

        let (locations, node_location) = dedupe_locations(&nodes);
        let n = locations.len();

        let legs = cost_model.table(&locations).map_err(|err| match err {
            TableError::Leg { from, to, source } => OptimizeError::CostModel {
                from: waypoint_for(from, &node_location, stops),
                to: waypoint_for(to, &node_location, stops),
                source,
            },
            TableError::Table(source) => OptimizeError::CostMatrix(source),
        })?;

        tracing::trace!(nodes = nodes.len(), unique = n, "travel matrix built");
        Ok(Self { node_location, legs })
    }

    /// Leg between two nodes (0 = origin, `i + 1` = stop `i`).
    pub fn leg(&self, from: usize, to: usize) -> Leg {
        self.legs[self.node_location[from]][self.node_location[to]]
    }

    pub fn node_count(&self) -> usize {
        self.node_location.len()
    }
}

/// First node that maps to a unique location, named for error reports.
fn waypoint_for(location: usize, node_location: &[usize], stops: &[Stop]) -> Waypoint {
    match node_location.iter().position(|&loc| loc == location) {
        Some(0) | None => Waypoint::Origin,
        Some(node) => Waypoint::Stop(stops[node - 1].id().clone()),
    }
}

fn dedupe_locations(nodes: &[Coordinate]) -> (Vec<Coordinate>, Vec<usize>) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut unique = Vec::new();
    let mut node_location = Vec::with_capacity(nodes.len());
    for location in nodes {
        let key = location_key(*location);
        let index = *seen.entry(key).or_insert_with(|| {
            unique.push(*location);
            unique.len() - 1
        });
        node_location.push(index);
    }
    (unique, node_location)
}

fn location_key(location: Coordinate) -> String {
    format!("{:.6},{:.6}", location.lat, location.lng)
}
