//! Core seams for the route optimizer.
//!
//! Callers inject travel costs through [`CostModel`]. Implementations may wrap
//! a mapping service; the optimizer memoizes every leg once per run.

use rayon::prelude::*;

use crate::error::{CostModelError, TableError};
use crate::model::{Coordinate, Leg};

/// Provides distance and duration between two coordinates.
///
/// Must be deterministic for identical inputs. Called from several threads
/// while a travel matrix is built.
pub trait CostModel: Send + Sync {
    fn leg(&self, from: Coordinate, to: Coordinate) -> Result<Leg, CostModelError>;

    /// Legs between every ordered pair of `locations`, row `i` starting at
    /// `locations[i]`. The diagonal is [`Leg::ZERO`].
    ///
    /// The default queries [`CostModel::leg`] once per pair in parallel.
    /// Services with a batch endpoint should override it.
    fn table(&self, locations: &[Coordinate]) -> Result<Vec<Vec<Leg>>, TableError> {
        let n = locations.len();
        (0..n)
            .into_par_iter()
            .map(|from| {
                (0..n)
                    .map(|to| {
                        if from == to {
                            return Ok(Leg::ZERO);
                        }
                        self.leg(locations[from], locations[to])
                            .map_err(|source| TableError::Leg { from, to, source })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }
}

impl<T: CostModel + ?Sized> CostModel for &T {
    fn leg(&self, from: Coordinate, to: Coordinate) -> Result<Leg, CostModelError> {
        (**self).leg(from, to)
    }

    fn table(&self, locations: &[Coordinate]) -> Result<Vec<Vec<Leg>>, TableError> {
        (**self).table(locations)
    }
}

impl<T: CostModel + ?Sized> CostModel for Box<T> {
    fn leg(&self, from: Coordinate, to: Coordinate) -> Result<Leg, CostModelError> {
        (**self).leg(from, to)
    }

    fn table(&self, locations: &[Coordinate]) -> Result<Vec<Vec<Leg>>, TableError> {
        (**self).table(locations)
    }
}

impl<T: CostModel + ?Sized> CostModel for std::sync::Arc<T> {
    fn leg(&self, from: Coordinate, to: Coordinate) -> Result<Leg, CostModelError> {
        (**self).leg(from, to)
    }

    fn table(&self, locations: &[Coordinate]) -> Result<Vec<Vec<Leg>>, TableError> {
        (**self).table(locations)
    }
}
