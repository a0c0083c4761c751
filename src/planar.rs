//! Flat Euclidean cost model.
//!
//! Reads coordinates as planar `(x, y)` points. Handy for synthetic grids
//! and for tests with exact expected costs.

use crate::error::CostModelError;
use crate::model::{Coordinate, Leg};
use crate::traits::CostModel;

#[derive(Debug, Clone)]
pub struct EuclideanCostModel {
    /// Distance units per second.
    pub speed: f64,
}

impl Default for EuclideanCostModel {
    fn default() -> Self {
        Self { speed: 1.0 }
    }
}

impl EuclideanCostModel {
    pub fn new(speed: f64) -> Self {
        Self { speed }
    }
}

impl CostModel for EuclideanCostModel {
    fn leg(&self, from: Coordinate, to: Coordinate) -> Result<Leg, CostModelError> {
        if self.speed <= 0.0 {
            return Err(CostModelError::Other(format!("speed must be positive, got {}", self.speed)));
        }
        let distance = (to.lat - from.lat).hypot(to.lng - from.lng);
        Ok(Leg::new(distance, distance / self.speed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_four_five() {
        let model = EuclideanCostModel::new(2.0);
        let leg = model.leg(Coordinate::new(0.0, 0.0), Coordinate::new(3.0, 4.0)).unwrap();
        assert_eq!(leg.distance, 5.0);
        assert_eq!(leg.duration, 2.5);
    }
}
