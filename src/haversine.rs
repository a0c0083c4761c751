//! Haversine cost model (fallback when OSRM is unavailable).
//!
//! Uses great-circle distance to estimate travel distance and time.
//! Less accurate than OSRM (ignores roads) but always available.

use crate::error::CostModelError;
use crate::model::{Coordinate, Leg};
use crate::traits::CostModel;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine-based cost model.
///
/// Distances are in metres, durations in seconds at an assumed speed.
#[derive(Debug, Clone)]
pub struct HaversineCostModel {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineCostModel {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineCostModel {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Calculate haversine distance between two points in kilometers.
    pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
        let lat1_rad = from.lat.to_radians();
        let lat2_rad = to.lat.to_radians();
        let delta_lat = (to.lat - from.lat).to_radians();
        let delta_lng = (to.lng - from.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    /// Convert distance in km to travel time in seconds.
    fn km_to_seconds(&self, km: f64) -> f64 {
        let hours = km / self.speed_kmh;
        (hours * 3600.0).round()
    }
}

impl CostModel for HaversineCostModel {
    fn leg(&self, from: Coordinate, to: Coordinate) -> Result<Leg, CostModelError> {
        if self.speed_kmh <= 0.0 {
            return Err(CostModelError::Other(format!(
                "speed must be positive, got {} km/h",
                self.speed_kmh
            )));
        }
        let km = Self::haversine_km(from, to);
        Ok(Leg::new(km * 1000.0, self.km_to_seconds(km)))
    }
}
