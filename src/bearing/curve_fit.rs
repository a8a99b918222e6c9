// Curve-fit bearing model
//
// Force regressed against measured control currents:
//   F = C2 * sv(I^2) + C1 * sv(I)
// The excitation is the coil current itself.

use std::fmt;

use super::force_law::QuadraticForceLaw;
use super::model::{require_positive, BearingModel};
use crate::config::{DEFAULT_C1, DEFAULT_C2, DEFAULT_CURVE_FIT_TURNS};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveFitBearing {
    c1: f64,
    c2: f64,
    turns: f64,
}

impl CurveFitBearing {
    /// Create from fitted coefficients C1 (linear) and C2 (quadratic)
    pub fn new(c1: f64, c2: f64, turns: f64) -> Result<Self> {
        require_positive("C1", c1)?;
        require_positive("C2", c2)?;
        require_positive("turns", turns)?;
        Ok(Self { c1, c2, turns })
    }

    pub fn c1(&self) -> f64 {
        self.c1
    }

    pub fn c2(&self) -> f64 {
        self.c2
    }
}

impl Default for CurveFitBearing {
    fn default() -> Self {
        Self {
            c1: DEFAULT_C1,
            c2: DEFAULT_C2,
            turns: DEFAULT_CURVE_FIT_TURNS,
        }
    }
}

impl BearingModel for CurveFitBearing {
    fn force_law(&self) -> QuadraticForceLaw {
        QuadraticForceLaw::new(self.c2, self.c1)
    }

    fn amps_per_unit(&self) -> f64 {
        1.0
    }

    fn turns(&self) -> f64 {
        self.turns
    }
}

impl fmt::Display for CurveFitBearing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "     {:<30}     {:<10}{:^6}", "Property:", "Value:", "Units:")?;
        writeln!(f, "     {:.<30}     {:<10}{:^6}", "C1   ", self.c1, "N/A")?;
        writeln!(f, "     {:.<30}     {:<10}{:^6}", "C2   ", self.c2, "N/A²")?;
        writeln!(f, "     {:.<30}     {:<10}{:^6}", "Number of Turns   ", self.turns, "-")
    }
}
