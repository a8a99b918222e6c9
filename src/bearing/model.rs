// Bearing parametrizations seen by the allocator

use super::force_law::QuadraticForceLaw;
use super::space_vector::PoleVector;
use crate::error::{AllocationError, Result};

/// A bearing parametrization
///
/// Implementors supply the coefficients of the quadratic force law and the
/// scaling from excitation (field or current) to coil current.
pub trait BearingModel {
    /// Coefficients of F = quadratic * sv(e^2) + linear * sv(e)
    fn force_law(&self) -> QuadraticForceLaw;

    /// Coil current (A) per unit of excitation
    fn amps_per_unit(&self) -> f64;

    /// Winding turns per pole
    fn turns(&self) -> f64;

    /// Fixed bias superimposed on every pole
    fn bias(&self) -> f64 {
        0.0
    }

    /// True if any pole exceeds the material limit
    fn is_saturated(&self, _excitation: &PoleVector) -> bool {
        false
    }
}

/// A bearing with a known saturation limit
pub trait Saturable: BearingModel {
    /// Largest sustainable total field on a pole
    fn saturation_limit(&self) -> f64;

    /// Analytic upper bound on the achievable force magnitude
    fn hexagon_bound(&self) -> f64;

    /// Largest total field (excitation + bias) over the poles
    fn peak_field(&self, excitation: &PoleVector) -> f64 {
        excitation.add_scalar(self.bias()).amax()
    }
}

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AllocationError::InvalidParameter {
            name,
            reason: format!("must be positive and finite, got {}", value),
        })
    }
}
