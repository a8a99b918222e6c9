// Space-vector transform for three-pole quantities
//
// A balanced three-pole quantity (currents or fields) is encoded as a single
// complex number: x1 + a*x2 + a^2*x3 with a = exp(i*2pi/3).

use nalgebra::Vector3;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Complex projection of a three-pole quantity
pub type SpaceVector = Complex64;

/// Per-pole quantity [pole 1, pole 2, pole 3]
pub type PoleVector = Vector3<f64>;

const SQRT3_OVER_3: f64 = 0.577_350_269_189_625_8;

/// The rotation operator a = exp(i*2pi/3)
#[inline]
fn rotation() -> Complex64 {
    Complex64::from_polar(1.0, 2.0 * PI / 3.0)
}

/// Project three pole quantities onto the complex plane
pub fn space_vec(x: &PoleVector) -> SpaceVector {
    let a = rotation();
    x[0] + a * x[1] + a * a * x[2]
}

/// Convert a space vector back to per-pole values
///
/// Assumes the pole values carry no common-mode component; any zero-sequence
/// offset in the original vector is lost.
pub fn sv_to_vec3(sv: SpaceVector) -> PoleVector {
    let (x, y) = (sv.re, sv.im);
    PoleVector::new(
        (2.0 / 3.0) * x,
        -(1.0 / 3.0) * x + SQRT3_OVER_3 * y,
        -(1.0 / 3.0) * x - SQRT3_OVER_3 * y,
    )
}

/// Angle (rad) and peak amplitude of a balanced three-pole quantity
pub fn peak_and_angle(x: &PoleVector) -> (f64, f64) {
    let sv = space_vec(x);
    (sv.arg(), (2.0 / 3.0) * sv.norm())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_pole_one_maps_to_real_axis() {
        let sv = space_vec(&PoleVector::new(1.0, 0.0, 0.0));
        assert_relative_eq!(sv.re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(sv.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_round_trip_without_common_mode() {
        let cases = [
            PoleVector::new(1.0, -0.5, -0.5),
            PoleVector::new(0.3205, 0.0198, -0.3403),
            PoleVector::new(-2.0, 3.5, -1.5),
        ];
        for v in cases {
            let back = sv_to_vec3(space_vec(&v));
            assert_relative_eq!(back, v, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_common_mode_is_dropped() {
        // a + a^2 = -1, so an equal offset on every pole vanishes
        let offset = PoleVector::new(2.0, 2.0, 2.0);
        let sv = space_vec(&offset);
        assert!(sv.norm() < 1e-12);

        let v = PoleVector::new(1.5, 0.5, 1.0);
        let back = sv_to_vec3(space_vec(&v));
        assert_relative_eq!(back.sum(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_peak_and_angle_of_balanced_set() {
        // cos set at 40 degrees with unit peak
        let theta = 40f64.to_radians();
        let v = PoleVector::new(
            theta.cos(),
            (theta - 2.0 * PI / 3.0).cos(),
            (theta + 2.0 * PI / 3.0).cos(),
        );
        let (angle, peak) = peak_and_angle(&v);
        assert_relative_eq!(peak, 1.0, epsilon = 1e-12);
        assert_relative_eq!(angle, theta, epsilon = 1e-12);
    }
}
