// Physical-parameter bearing model
//
// Derives the quadratic force law from the bearing geometry. The excitation is
// the control field Bc (T) on each pole; the total pole field is Bc + B0.

use std::f64::consts::PI;
use std::fmt;

use super::force_law::QuadraticForceLaw;
use super::model::{require_positive, BearingModel, Saturable};
use super::space_vector::PoleVector;
use crate::config::{
    DEFAULT_AIRGAP, DEFAULT_BMAX, DEFAULT_LAMINATION_LENGTH, DEFAULT_POLE_SPAN_DEG,
    DEFAULT_ROTOR_RADIUS, DEFAULT_TURNS, DEFAULT_ZETA,
};
use crate::error::{AllocationError, Result};

/// Permeability of free space (H/m)
pub const MU_0: f64 = PI * 4e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalBearing {
    bmax: f64,
    zeta: f64,
    pole_span: f64, // rad
    airgap: f64,
    rotor_radius: f64,
    lamination_length: f64,
    turns: f64,
    b0: f64,
    k1: f64,
    k2: f64,
}

impl PhysicalBearing {
    /// Create from geometry
    ///
    /// # Arguments
    /// * `bmax` - Saturation flux density (T)
    /// * `zeta` - Bias field as a fraction of `bmax`
    /// * `pole_span_deg` - Angular span of each radial tooth (degrees)
    /// * `airgap` - Airgap length (m)
    /// * `rotor_radius` - Rotor radius (m)
    /// * `lamination_length` - Stator lamination stack length (m)
    /// * `turns` - Turns on each radial pole
    pub fn new(
        bmax: f64,
        zeta: f64,
        pole_span_deg: f64,
        airgap: f64,
        rotor_radius: f64,
        lamination_length: f64,
        turns: f64,
    ) -> Result<Self> {
        require_positive("bmax", bmax)?;
        require_positive("airgap", airgap)?;
        require_positive("rotor_radius", rotor_radius)?;
        require_positive("lamination_length", lamination_length)?;
        require_positive("turns", turns)?;
        if !(zeta > 0.0 && zeta < 1.0) {
            return Err(AllocationError::InvalidParameter {
                name: "zeta",
                reason: format!("bias fraction must lie in (0, 1), got {}", zeta),
            });
        }
        if !(pole_span_deg > 0.0 && pole_span_deg < 120.0) {
            return Err(AllocationError::InvalidParameter {
                name: "pole_span_deg",
                reason: format!("three poles need a span in (0, 120), got {}", pole_span_deg),
            });
        }

        let pole_span = pole_span_deg.to_radians();
        let area = rotor_radius * pole_span * lamination_length;
        let beta = 2.0 * (pole_span / 2.0).sin() / pole_span; // tooth area correction
        let k1 = beta * area / (2.0 * MU_0);
        let k2 = turns * MU_0 / airgap; // Bc = k2 * Ic

        Ok(Self {
            bmax,
            zeta,
            pole_span,
            airgap,
            rotor_radius,
            lamination_length,
            turns,
            b0: zeta * bmax,
            k1,
            k2,
        })
    }

    /// Replace the geometric constants with a measured (C1, C2) fit
    ///
    /// Saturation data (Bmax, B0) is kept.
    pub fn with_curve_fit(mut self, c1: f64, c2: f64) -> Result<Self> {
        require_positive("C1", c1)?;
        require_positive("C2", c2)?;
        self.k1 = c1 * c1 / (4.0 * self.b0 * self.b0 * c2);
        self.k2 = 2.0 * self.b0 * c2 / c1;
        Ok(self)
    }

    pub fn bmax(&self) -> f64 {
        self.bmax
    }

    pub fn zeta(&self) -> f64 {
        self.zeta
    }

    /// Bias field B0 = zeta * Bmax
    pub fn b0(&self) -> f64 {
        self.b0
    }

    pub fn pole_span_deg(&self) -> f64 {
        self.pole_span.to_degrees()
    }

    /// Force constant: F = k1 * (sv(Bc^2) + 2*B0*sv(Bc))
    pub fn k1(&self) -> f64 {
        self.k1
    }

    /// Field per amp: Bc = k2 * Ic
    pub fn k2(&self) -> f64 {
        self.k2
    }
}

impl Default for PhysicalBearing {
    fn default() -> Self {
        Self::new(
            DEFAULT_BMAX,
            DEFAULT_ZETA,
            DEFAULT_POLE_SPAN_DEG,
            DEFAULT_AIRGAP,
            DEFAULT_ROTOR_RADIUS,
            DEFAULT_LAMINATION_LENGTH,
            DEFAULT_TURNS,
        )
        .unwrap_or_else(|e| unreachable!("default bearing parameters are valid: {}", e))
    }
}

impl BearingModel for PhysicalBearing {
    fn force_law(&self) -> QuadraticForceLaw {
        QuadraticForceLaw::new(self.k1, 2.0 * self.b0 * self.k1)
    }

    fn amps_per_unit(&self) -> f64 {
        1.0 / self.k2
    }

    fn turns(&self) -> f64 {
        self.turns
    }

    fn bias(&self) -> f64 {
        self.b0
    }

    fn is_saturated(&self, excitation: &PoleVector) -> bool {
        self.peak_field(excitation) > self.bmax
    }
}

impl Saturable for PhysicalBearing {
    fn saturation_limit(&self) -> f64 {
        self.bmax
    }

    fn hexagon_bound(&self) -> f64 {
        self.k1 * self.bmax * self.bmax
    }
}

impl fmt::Display for PhysicalBearing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: [(&str, f64, &str); 7] = [
            ("Bmax", self.bmax, "T"),
            ("\u{03B6}", round_to(self.zeta, 6), "-"),
            ("\u{03B8}\u{2081}", round_to(self.pole_span_deg(), 6), "\u{00B0}"),
            ("Rotor Radius", self.rotor_radius, "m"),
            ("Air Gap", self.airgap, "m"),
            ("Stator Lamination Length", self.lamination_length, "m"),
            ("Number of Turns", self.turns, "-"),
        ];
        writeln!(f, "     {:<30}     {:<10}{:^6}", "Property:", "Value:", "Units:")?;
        for (label, value, unit) in rows {
            writeln!(f, "     {:.<30}     {:<10}{:^6}", format!("{}   ", label), value, unit)?;
        }
        Ok(())
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}
