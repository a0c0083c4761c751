//! Shared, read-only traffic conditions.
//!
//! A [`TrafficFeed`] holds the latest [`TrafficSnapshot`] behind an `Arc`.
//! Each optimization run takes one snapshot up front and reads only that, so
//! a concurrent `publish` never changes costs halfway through a search.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{CostModelError, TableError};
use crate::haversine::HaversineCostModel;
use crate::model::{Coordinate, Leg};
use crate::traits::CostModel;

/// A circular area where travel is slower (or faster) than usual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficZone {
    pub center: Coordinate,
    pub radius_km: f64,
    /// Duration multiplier inside the zone.
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    pub version: u64,
    pub default_factor: f64,
    pub zones: Vec<TrafficZone>,
}

impl Default for TrafficSnapshot {
    fn default() -> Self {
        Self {
            version: 0,
            default_factor: 1.0,
            zones: Vec::new(),
        }
    }
}

impl TrafficSnapshot {
    /// Duration multiplier at a point. The slowest matching zone wins.
    pub fn factor_at(&self, point: Coordinate) -> f64 {
        self.zones
            .iter()
            .filter(|zone| HaversineCostModel::haversine_km(zone.center, point) <= zone.radius_km)
            .map(|zone| zone.factor)
            .fold(None, |slowest: Option<f64>, factor| {
                Some(slowest.map_or(factor, |current| current.max(factor)))
            })
            .unwrap_or(self.default_factor)
    }
}

/// Publishes traffic snapshots to concurrent optimizations.
#[derive(Debug, Default)]
pub struct TrafficFeed {
    current: RwLock<Arc<TrafficSnapshot>>,
}

impl TrafficFeed {
    pub fn new(initial: TrafficSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn snapshot(&self) -> Arc<TrafficSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current snapshot. Runs holding an older one keep it.
    pub fn publish(&self, snapshot: TrafficSnapshot) {
        tracing::info!(version = snapshot.version, zones = snapshot.zones.len(), "traffic snapshot published");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }
}

/// Scales leg durations by the traffic factor at the leg midpoint.
#[derive(Debug, Clone)]
pub struct TrafficAware<C> {
    inner: C,
    snapshot: Arc<TrafficSnapshot>,
}

impl<C: CostModel> TrafficAware<C> {
    pub fn new(inner: C, snapshot: Arc<TrafficSnapshot>) -> Self {
        Self { inner, snapshot }
    }

    pub fn snapshot(&self) -> &TrafficSnapshot {
        &self.snapshot
    }
}

impl<C: CostModel> CostModel for TrafficAware<C> {
    fn leg(&self, from: Coordinate, to: Coordinate) -> Result<Leg, CostModelError> {
        let leg = self.inner.leg(from, to)?;
        let factor = self.snapshot.factor_at(from.midpoint(&to));
        Ok(Leg::new(leg.distance, leg.duration * factor))
    }

    /// Scales the wrapped model's table, keeping its batch request.
    fn table(&self, locations: &[Coordinate]) -> Result<Vec<Vec<Leg>>, TableError> {
        let mut legs = self.inner.table(locations)?;
        for (from, row) in legs.iter_mut().enumerate() {
            for (to, leg) in row.iter_mut().enumerate() {
                let factor = self.snapshot.factor_at(locations[from].midpoint(&locations[to]));
                *leg = Leg::new(leg.distance, leg.duration * factor);
            }
        }
        Ok(legs)
    }
}
