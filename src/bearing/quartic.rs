// Real roots of the depressed quartic y^4 + p*y^2 + q*y + r = 0
//
// Two strategies:
// - Numeric: eigenvalues of the companion matrix
// - Analytic: Cardano/Ferrari via the resolvent cubic
//
// Either way only roots with a negligible imaginary part are returned.

use nalgebra::Matrix4;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{IMAGINARY_TOLERANCE, ZERO_ROOT_TOLERANCE};
use crate::error::{AllocationError, Result};

/// How the quartic roots are found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootStrategy {
    #[default]
    Numeric,
    Analytic,
}

/// Coefficients of y^4 + p*y^2 + q*y + r
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepressedQuartic {
    pub p: f64,
    pub q: f64,
    pub r: f64,
}

impl DepressedQuartic {
    pub fn new(p: f64, q: f64, r: f64) -> Self {
        Self { p, q, r }
    }

    /// Evaluate the polynomial at a real point
    pub fn eval(&self, y: f64) -> f64 {
        let y2 = y * y;
        y2 * y2 + self.p * y2 + self.q * y + self.r
    }

    /// All four roots, complex ones included
    pub fn roots(&self, strategy: RootStrategy) -> Result<[Complex64; 4]> {
        match strategy {
            RootStrategy::Numeric => Ok(self.companion_roots()),
            RootStrategy::Analytic => self.cardano_roots(),
        }
    }

    /// Real roots only (imaginary residual below tolerance)
    ///
    /// May return fewer than four values, or none.
    pub fn real_roots(&self, strategy: RootStrategy) -> Result<Vec<f64>> {
        let roots = self.roots(strategy)?;
        let real: Vec<f64> = roots
            .iter()
            .filter(|z| z.im.abs() < IMAGINARY_TOLERANCE)
            .map(|z| z.re)
            .collect();
        debug!(
            "Quartic p={:.6e} q={:.6e} r={:.6e}: {} real roots ({:?})",
            self.p,
            self.q,
            self.r,
            real.len(),
            strategy
        );
        Ok(real)
    }

    fn companion_roots(&self) -> [Complex64; 4] {
        // Companion matrix of [1, 0, p, q, r]
        #[rustfmt::skip]
        let companion = Matrix4::new(
            0.0, -self.p, -self.q, -self.r,
            1.0,  0.0,     0.0,     0.0,
            0.0,  1.0,     0.0,     0.0,
            0.0,  0.0,     1.0,     0.0,
        );
        let eig = companion.complex_eigenvalues();
        [eig[0], eig[1], eig[2], eig[3]]
    }

    /// Roots of the resolvent cubic used by Cardano's method
    fn auxiliary_roots(&self) -> Result<[Complex64; 3]> {
        let (p, q, r) = (self.p, self.q, self.r);
        let d1 = -16.0 * p * p - 192.0 * r;
        let d2 = 128.0 * p.powi(3) + 1728.0 * q * q - 4608.0 * p * r;
        let disc = 4.0 * d1.powi(3) + d2 * d2;

        let c = if disc >= 0.0 {
            // real argument: sign-preserving real cube root
            Complex64::new((d2 + disc.sqrt()).cbrt(), 0.0)
        } else {
            principal_cbrt(Complex64::new(d2, (-disc).sqrt()))
        };
        if c.norm() < ZERO_ROOT_TOLERANCE {
            return Err(AllocationError::DegenerateAuxiliaryRoot { p, q, r });
        }

        let sqrt3 = 3f64.sqrt();
        let t1 = Complex64::from(p / 3.0);
        let t2 = d1 / (12.0 * 2f64.powf(2.0 / 3.0) * c);
        let t3 = c / (24.0 * 2f64.cbrt());
        let a = Complex64::new(1.0, sqrt3);
        let b = Complex64::new(1.0, -sqrt3);

        Ok([
            -t1 - t2 + t3,
            -t1 + a * t2 / 2.0 - b * t3 / 2.0,
            -t1 + b * t2 / 2.0 - a * t3 / 2.0,
        ])
    }

    /// Pick the largest-magnitude auxiliary root; zero breaks the method
    fn auxiliary_root(&self) -> Result<Complex64> {
        let candidates = self.auxiliary_roots()?;
        let m = candidates
            .into_iter()
            .max_by(|x, y| x.norm().total_cmp(&y.norm()))
            .unwrap_or_default();
        if m.norm() < ZERO_ROOT_TOLERANCE {
            return Err(AllocationError::DegenerateAuxiliaryRoot {
                p: self.p,
                q: self.q,
                r: self.r,
            });
        }
        Ok(m)
    }

    fn cardano_roots(&self) -> Result<[Complex64; 4]> {
        let m = self.auxiliary_root()?;
        let t1 = (2.0 * m).sqrt();
        let t2 = 2.0 * self.p + 2.0 * m;
        let t3 = (2.0 / m).sqrt() * self.q;
        let plus = (-(t2 + t3)).sqrt();
        let minus = (-(t2 - t3)).sqrt();

        Ok([
            (t1 + plus) / 2.0,
            (t1 - plus) / 2.0,
            (-t1 + minus) / 2.0,
            (-t1 - minus) / 2.0,
        ])
    }
}

/// Principal cube root: |z|^(1/3) * exp(i*arg(z)/3)
fn principal_cbrt(z: Complex64) -> Complex64 {
    Complex64::from_polar(z.norm().cbrt(), z.arg() / 3.0)
}
