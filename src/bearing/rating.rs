// Force rating of saturating bearings
//
// max_force(alpha) is the magnitude at which the least-saturated candidate
// just reaches Bmax; rated_force is the smallest max_force over one 60° sector.

use tracing::{debug, warn};

use super::allocator::ForceAllocator;
use super::model::Saturable;
use super::optimize::{self, SearchFailure};
use crate::config::{
    NEWTON_MAX_ITER, NEWTON_SEED, RATED_SPAN_DEG, RATING_BOUND_FACTOR, RATING_SEARCH_LOWER,
};
use crate::error::{AllocationError, Result};

impl<M: Saturable> ForceAllocator<M> {
    /// Peak field of the least-saturated candidate minus Bmax
    ///
    /// Negative while some candidate stays below saturation.
    pub fn saturation_residual(&self, direction_deg: f64, magnitude: f64) -> Result<f64> {
        let model = self.model();
        self.candidates(direction_deg, magnitude)?
            .iter()
            .map(|e| model.peak_field(e))
            .min_by(f64::total_cmp)
            .map(|peak| peak - model.saturation_limit())
            .ok_or(AllocationError::NoFeasibleSolution {
                direction: direction_deg,
                magnitude,
            })
    }

    /// Largest force magnitude in a direction before every candidate saturates
    pub fn max_force(&self, direction_deg: f64) -> Result<f64> {
        let upper = RATING_BOUND_FACTOR * self.model().hexagon_bound();
        let residual = |mag: f64| self.saturation_residual(direction_deg, mag);

        match optimize::brent_root(residual, RATING_SEARCH_LOWER, upper) {
            Ok(mag) => {
                debug!("max force at {}°: {:.4} N", direction_deg, mag);
                return Ok(mag);
            }
            Err(e) => warn!(
                "Bracketed search failed at {}° ({:?}), falling back to secant",
                direction_deg, e
            ),
        }

        let mut evaluations = 0;
        let result = optimize::secant(
            |mag| {
                evaluations += 1;
                self.saturation_residual(direction_deg, mag)
            },
            NEWTON_SEED,
            NEWTON_MAX_ITER,
        );
        result.map_err(|e| search_error(direction_deg, evaluations, e))
    }

    /// Direction in [0°, 60°] with the smallest max force
    pub fn weakest_direction(&self) -> Result<f64> {
        let (lower, upper) = RATED_SPAN_DEG;
        let mut last = lower;
        let mut evaluations = 0;
        let result = optimize::minimize_bounded(
            |alpha| {
                last = alpha;
                evaluations += 1;
                self.max_force(alpha)
            },
            lower,
            upper,
        );
        result.map_err(|e| search_error(last, evaluations, e))
    }

    /// Force the bearing can deliver in every direction
    pub fn rated_force(&self) -> Result<f64> {
        let alpha = self.weakest_direction()?;
        let rated = self.max_force(alpha)?;
        debug!("rated force {:.4} N (weakest at {:.3}°)", rated, alpha);
        Ok(rated)
    }
}

/// Every exhausted search surfaces as `RatingSearchFailed`
///
/// A failure already reported by a nested search keeps its own direction.
fn search_error(direction: f64, evaluations: usize, failure: SearchFailure) -> AllocationError {
    let iterations = match failure {
        SearchFailure::Objective(inner @ AllocationError::RatingSearchFailed { .. }) => {
            return inner;
        }
        SearchFailure::Objective(inner) => {
            warn!("Rating search at {}° stopped: {}", direction, inner);
            evaluations
        }
        SearchFailure::NoConvergence { iterations } => iterations,
        SearchFailure::NotBracketed { .. } => evaluations,
    };
    AllocationError::RatingSearchFailed {
        direction,
        iterations,
    }
}
