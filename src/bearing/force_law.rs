// Quadratic force law shared by both bearing parametrizations
//
//   F = quadratic * sv(e^2) + linear * sv(e)
//
// where e is the per-pole excitation (field or current) and sv the space-vector
// transform. The physical model has quadratic = k1, linear = 2*B0*k1; the
// curve-fit model has quadratic = C2, linear = C1.

use serde::{Deserialize, Serialize};

use super::quartic::DepressedQuartic;
use super::space_vector::{space_vec, PoleVector, SpaceVector};
use crate::config::{
    CANDIDATE_TOLERANCE, REFINE_MAX_STEPS, SINGULAR_AXIS_MARGIN_DEG, ZERO_ROOT_TOLERANCE,
};

/// Radial force as direction (degrees, [0, 360)) and magnitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceVector {
    pub direction_deg: f64,
    pub magnitude: f64,
}

impl ForceVector {
    /// Build a force, wrapping the direction into [0, 360)
    pub fn new(direction_deg: f64, magnitude: f64) -> Self {
        Self {
            direction_deg: normalize_degrees(direction_deg),
            magnitude,
        }
    }

    /// Cartesian components (Fx, Fy)
    pub fn components(&self) -> (f64, f64) {
        let alpha = self.direction_deg.to_radians();
        (self.magnitude * alpha.cos(), self.magnitude * alpha.sin())
    }
}

/// Wrap an angle into [0, 360)
pub fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Which excitation coordinate the quartic is solved for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formulation {
    /// Solve for Im(excitation) first, back-substitute Re
    ImaginaryFirst,
    /// Solve for Re(excitation) first; used near the pole-1 axis
    RealFirst,
}

impl Formulation {
    /// Pick the formulation for a force direction
    ///
    /// The imaginary-first back-substitution divides by the root, which
    /// vanishes as the force approaches 0 or 180 degrees.
    pub fn for_direction(direction_deg: f64) -> Self {
        let alpha = normalize_degrees(direction_deg);
        let near_axis = [0.0, 180.0, 360.0]
            .iter()
            .any(|axis| (alpha - axis).abs() < SINGULAR_AXIS_MARGIN_DEG);
        if near_axis {
            Self::RealFirst
        } else {
            Self::ImaginaryFirst
        }
    }
}

/// Coefficients of the quadratic force law
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticForceLaw {
    pub quadratic: f64,
    pub linear: f64,
}

impl QuadraticForceLaw {
    pub fn new(quadratic: f64, linear: f64) -> Self {
        Self { quadratic, linear }
    }

    /// Depressed quartic in the first-solved coordinate
    pub fn quartic(&self, formulation: Formulation, fx: f64, fy: f64) -> DepressedQuartic {
        let (a, b) = (self.quadratic, self.linear);
        match formulation {
            Formulation::ImaginaryFirst => DepressedQuartic::new(
                (-27.0 * b * b + 12.0 * a * fx) / (4.0 * a * a),
                (9.0 * b * fy) / (a * a),
                -(9.0 * fy * fy) / (4.0 * a * a),
            ),
            Formulation::RealFirst => DepressedQuartic::new(
                -(27.0 * b * b + 12.0 * a * fx) / (4.0 * a * a),
                (27.0 * b.powi(3) + 36.0 * a * b * fx) / (4.0 * a.powi(3)),
                -(27.0 * b * b * fx + 9.0 * a * fy * fy) / (4.0 * a.powi(3)),
            ),
        }
    }

    /// Recover the paired coordinate for a quartic root
    ///
    /// Returns `None` when the back-substitution would divide by zero.
    pub fn pair(&self, formulation: Formulation, fy: f64, root: f64) -> Option<SpaceVector> {
        let (a, b) = (self.quadratic, self.linear);
        match formulation {
            Formulation::ImaginaryFirst => {
                if root.abs() < ZERO_ROOT_TOLERANCE {
                    return None;
                }
                let x = 1.5 * (b / a - fy / (a * root));
                Some(SpaceVector::new(x, root))
            }
            Formulation::RealFirst => {
                let denom = 3.0 * b - 2.0 * a * root;
                if denom.abs() <= ZERO_ROOT_TOLERANCE * (3.0 * b).abs() {
                    return None;
                }
                let y = 3.0 * fy / denom;
                Some(SpaceVector::new(root, y))
            }
        }
    }

    /// Space-vector force produced by a per-pole excitation
    pub fn force_space_vector(&self, excitation: &PoleVector) -> SpaceVector {
        let squared = excitation.map(|e| e * e);
        self.quadratic * space_vec(&squared) + self.linear * space_vec(excitation)
    }

    /// Force of the zero-common-mode excitation encoded by `sv`
    ///
    /// Closed form of `force_space_vector(&sv_to_vec3(sv))`:
    /// quadratic * conj(sv)^2 / 3 + linear * sv.
    pub fn force_of_space_vector(&self, sv: SpaceVector) -> SpaceVector {
        self.quadratic * sv.conj().powi(2) / 3.0 + self.linear * sv
    }

    /// Newton-polish `sv` until its force matches `target`
    ///
    /// Stops early where the Jacobian is singular (two solutions merging);
    /// callers check the result with [`Self::reproduces`].
    pub fn refine(&self, sv: SpaceVector, target: SpaceVector) -> SpaceVector {
        let (a, b) = (self.quadratic, self.linear);
        let mut sv = sv;
        for _ in 0..REFINE_MAX_STEPS {
            let residual = self.force_of_space_vector(sv) - target;
            // Jacobian of (Fx, Fy) in (x, y) is symmetric
            let j11 = b + 2.0 * a * sv.re / 3.0;
            let j22 = b - 2.0 * a * sv.re / 3.0;
            let j12 = -2.0 * a * sv.im / 3.0;
            let det = j11 * j22 - j12 * j12;
            if !det.is_finite() || det.abs() <= ZERO_ROOT_TOLERANCE * b * b {
                break;
            }
            let step = SpaceVector::new(
                (j22 * residual.re - j12 * residual.im) / det,
                (j11 * residual.im - j12 * residual.re) / det,
            );
            sv -= step;
            if step.norm() <= f64::EPSILON * sv.norm() || !sv.is_finite() {
                break;
            }
        }
        sv
    }

    /// True if `sv` produces `target` to within the candidate tolerance
    ///
    /// The tolerance is relative to the largest term of the force law, not
    /// to the target alone.
    pub fn reproduces(&self, sv: SpaceVector, target: SpaceVector) -> bool {
        let norm = sv.norm();
        let scale = target.norm() + self.linear * norm + self.quadratic * norm * norm / 3.0;
        let miss = (self.force_of_space_vector(sv) - target).norm();
        miss.is_finite() && miss <= CANDIDATE_TOLERANCE * scale
    }

    /// Force direction and magnitude produced by a per-pole excitation
    pub fn force(&self, excitation: &PoleVector) -> ForceVector {
        let f = self.force_space_vector(excitation);
        let alpha = (f.arg().to_degrees() + 720.0) % 360.0;
        ForceVector {
            direction_deg: alpha,
            magnitude: f.norm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bearing::quartic::RootStrategy;
    use crate::bearing::space_vector::sv_to_vec3;
    use approx::assert_relative_eq;

    const CURVE_FIT: QuadraticForceLaw = QuadraticForceLaw {
        quadratic: 48.016,
        linear: 175.677,
    };

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_relative_eq!(normalize_degrees(-30.0), 330.0);
        assert_relative_eq!(normalize_degrees(725.0), 5.0);
        assert!(normalize_degrees(-1e-18) < 360.0);
    }

    #[test]
    fn test_formulation_near_axis() {
        assert_eq!(Formulation::for_direction(0.0), Formulation::RealFirst);
        assert_eq!(Formulation::for_direction(0.5), Formulation::RealFirst);
        assert_eq!(Formulation::for_direction(179.2), Formulation::RealFirst);
        assert_eq!(Formulation::for_direction(359.5), Formulation::RealFirst);
        assert_eq!(Formulation::for_direction(-0.5), Formulation::RealFirst);
        assert_eq!(Formulation::for_direction(1.5), Formulation::ImaginaryFirst);
        assert_eq!(Formulation::for_direction(30.0), Formulation::ImaginaryFirst);
        assert_eq!(Formulation::for_direction(270.0), Formulation::ImaginaryFirst);
    }

    #[test]
    fn test_known_forward_force() {
        // one unit on pole 1, balanced return on poles 2 and 3
        let force = CURVE_FIT.force(&PoleVector::new(1.0, -0.5, -0.5));
        // direction may land just below 360 instead of at 0
        let off_axis = force.direction_deg.min(360.0 - force.direction_deg);
        assert!(off_axis < 1e-9, "direction {}", force.direction_deg);
        assert_relative_eq!(force.magnitude, 299.5275, epsilon = 1e-9);
    }

    #[test]
    fn test_forward_direction_is_never_negative() {
        let force = CURVE_FIT.force(&PoleVector::new(-1.0, 0.5, 0.5));
        assert!(force.direction_deg >= 0.0 && force.direction_deg < 360.0);
    }

    #[test]
    fn test_both_formulations_reproduce_the_force() {
        let target = ForceVector::new(40.0, 120.0);
        let (fx, fy) = target.components();
        for formulation in [Formulation::ImaginaryFirst, Formulation::RealFirst] {
            let roots = CURVE_FIT
                .quartic(formulation, fx, fy)
                .real_roots(RootStrategy::Numeric)
                .unwrap();
            assert!(!roots.is_empty());
            for root in roots {
                let sv = CURVE_FIT.pair(formulation, fy, root).unwrap();
                let force = CURVE_FIT.force(&sv_to_vec3(sv));
                assert_relative_eq!(force.magnitude, 120.0, epsilon = 1e-6);
                assert_relative_eq!(force.direction_deg, 40.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_closed_form_matches_pole_force() {
        for sv in [
            SpaceVector::new(0.48, 0.31),
            SpaceVector::new(-11.4, 0.09),
            SpaceVector::new(3e-9, -7e-9),
        ] {
            let closed = CURVE_FIT.force_of_space_vector(sv);
            let poles = CURVE_FIT.force_space_vector(&sv_to_vec3(sv));
            assert_relative_eq!(closed.re, poles.re, epsilon = 1e-12 * (1.0 + poles.norm()));
            assert_relative_eq!(closed.im, poles.im, epsilon = 1e-12 * (1.0 + poles.norm()));
        }
    }

    #[test]
    fn test_refine_from_linear_seed_finds_small_solution() {
        for magnitude in [1e-6, 1e-2, 10.0] {
            let target = SpaceVector::from_polar(magnitude, 30f64.to_radians());
            let sv = CURVE_FIT.refine(target / CURVE_FIT.linear, target);
            assert!(CURVE_FIT.reproduces(sv, target));
            let force = CURVE_FIT.force_of_space_vector(sv);
            assert_relative_eq!(force.norm(), magnitude, max_relative = 1e-12);
            assert!(sv.norm() < 2.0 * magnitude / CURVE_FIT.linear);
        }
    }

    #[test]
    fn test_refine_repairs_a_perturbed_root() {
        let target = SpaceVector::from_polar(0.01, 30f64.to_radians());
        let (fx, fy) = (target.re, target.im);
        let roots = CURVE_FIT
            .quartic(Formulation::ImaginaryFirst, fx, fy)
            .real_roots(RootStrategy::Numeric)
            .unwrap();
        let smallest = roots
            .into_iter()
            .min_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap();
        // a relative error of 1e-6 in the root wrecks the paired coordinate
        let rough = CURVE_FIT
            .pair(Formulation::ImaginaryFirst, fy, smallest * (1.0 + 1e-6))
            .unwrap();
        assert!(!CURVE_FIT.reproduces(rough, target));
        assert!(CURVE_FIT.reproduces(CURVE_FIT.refine(rough, target), target));
    }

    #[test]
    fn test_zero_root_has_no_pair() {
        assert!(CURVE_FIT.pair(Formulation::ImaginaryFirst, 0.0, 0.0).is_none());
    }
}
