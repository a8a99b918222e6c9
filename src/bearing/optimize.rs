// Scalar root finding and bounded minimization for the rating search
//
// - brent_root: bracketed root (Brent 1973), needs a sign change on [a, b]
// - secant: unbracketed fallback seeded at one point
// - minimize_bounded: Brent's golden-section/parabolic minimizer on [a, b]

use crate::error::AllocationError;

/// Why a scalar search stopped without an answer
#[derive(Debug, Clone, PartialEq)]
pub enum SearchFailure {
    NotBracketed { lower: f64, upper: f64 },
    NoConvergence { iterations: usize },
    Objective(AllocationError),
}

impl From<AllocationError> for SearchFailure {
    fn from(e: AllocationError) -> Self {
        Self::Objective(e)
    }
}

pub type SearchResult = std::result::Result<f64, SearchFailure>;

const BRENT_XTOL: f64 = 2e-12;
const BRENT_RTOL: f64 = 4.0 * f64::EPSILON;
const BRENT_MAX_ITER: usize = 100;

const SECANT_TOL: f64 = 1.48e-8;

const MINIMIZE_XATOL: f64 = 1e-5;
const MINIMIZE_MAX_EVAL: usize = 500;

/// Root of `f` on [a, b]; f(a) and f(b) must differ in sign
pub fn brent_root<F>(mut f: F, a: f64, b: f64) -> SearchResult
where
    F: FnMut(f64) -> Result<f64, AllocationError>,
{
    let (mut xpre, mut xcur) = (a, b);
    let mut fpre = f(xpre)?;
    let mut fcur = f(xcur)?;

    if fpre == 0.0 {
        return Ok(xpre);
    }
    if fcur == 0.0 {
        return Ok(xcur);
    }
    if fpre.signum() == fcur.signum() {
        return Err(SearchFailure::NotBracketed { lower: a, upper: b });
    }

    let (mut xblk, mut fblk) = (0.0, 0.0);
    let (mut spre, mut scur) = (0.0f64, 0.0f64);

    for _ in 0..BRENT_MAX_ITER {
        if fpre != 0.0 && fcur != 0.0 && fpre.signum() != fcur.signum() {
            xblk = xpre;
            fblk = fpre;
            spre = xcur - xpre;
            scur = spre;
        }
        if fblk.abs() < fcur.abs() {
            // keep the best estimate in xcur
            xpre = xcur;
            xcur = xblk;
            xblk = xpre;
            fpre = fcur;
            fcur = fblk;
            fblk = fpre;
        }

        let delta = (BRENT_XTOL + BRENT_RTOL * xcur.abs()) / 2.0;
        let sbis = (xblk - xcur) / 2.0;
        if fcur == 0.0 || sbis.abs() < delta {
            return Ok(xcur);
        }

        if spre.abs() > delta && fcur.abs() < fpre.abs() {
            let stry = if xpre == xblk {
                // secant
                -fcur * (xcur - xpre) / (fcur - fpre)
            } else {
                // inverse quadratic interpolation
                let dpre = (fpre - fcur) / (xpre - xcur);
                let dblk = (fblk - fcur) / (xblk - xcur);
                -fcur * (fblk * dblk - fpre * dpre) / (dblk * dpre * (fblk - fpre))
            };
            if 2.0 * stry.abs() < spre.abs().min(3.0 * sbis.abs() - delta) {
                spre = scur;
                scur = stry;
            } else {
                spre = sbis;
                scur = sbis;
            }
        } else {
            spre = sbis;
            scur = sbis;
        }

        xpre = xcur;
        fpre = fcur;
        if scur.abs() > delta {
            xcur += scur;
        } else {
            xcur += if sbis > 0.0 { delta } else { -delta };
        }
        fcur = f(xcur)?;
    }

    Err(SearchFailure::NoConvergence {
        iterations: BRENT_MAX_ITER,
    })
}

/// Root of `f` by the secant method, seeded at `x0`
pub fn secant<F>(mut f: F, x0: f64, max_iter: usize) -> SearchResult
where
    F: FnMut(f64) -> Result<f64, AllocationError>,
{
    let eps = 1e-4;
    let mut p0 = x0;
    let mut p1 = x0 * (1.0 + eps) + if x0 >= 0.0 { eps } else { -eps };
    let mut q0 = f(p0)?;
    let mut q1 = f(p1)?;
    if q1.abs() < q0.abs() {
        std::mem::swap(&mut p0, &mut p1);
        std::mem::swap(&mut q0, &mut q1);
    }

    for _ in 0..max_iter {
        if q1 == q0 {
            if p1 != p0 {
                return Err(SearchFailure::NoConvergence {
                    iterations: max_iter,
                });
            }
            return Ok((p1 + p0) / 2.0);
        }
        let p = if q1.abs() > q0.abs() {
            (-q0 / q1 * p1 + p0) / (1.0 - q0 / q1)
        } else {
            (-q1 / q0 * p0 + p1) / (1.0 - q1 / q0)
        };
        if !p.is_finite() {
            break;
        }
        if (p - p1).abs() < SECANT_TOL {
            return Ok(p);
        }
        p0 = p1;
        q0 = q1;
        p1 = p;
        q1 = f(p1)?;
    }

    Err(SearchFailure::NoConvergence {
        iterations: max_iter,
    })
}

/// Minimizer of `f` on [lower, upper]
pub fn minimize_bounded<F>(mut f: F, lower: f64, upper: f64) -> SearchResult
where
    F: FnMut(f64) -> Result<f64, AllocationError>,
{
    let sqrt_eps = f64::EPSILON.sqrt();
    let golden_mean = 0.5 * (3.0 - 5f64.sqrt());

    let (mut a, mut b) = (lower, upper);
    let mut fulc = a + golden_mean * (b - a);
    let mut nfc = fulc;
    let mut xf = fulc;
    let mut rat: f64 = 0.0;
    let mut e: f64 = 0.0;
    let mut fx = f(xf)?;
    let mut evals = 1;
    let mut ffulc = fx;
    let mut fnfc = fx;
    let mut xm = 0.5 * (a + b);
    let mut tol1 = sqrt_eps * xf.abs() + MINIMIZE_XATOL / 3.0;
    let mut tol2 = 2.0 * tol1;

    while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
        let mut golden = true;

        if e.abs() > tol1 {
            // try a parabolic step
            golden = false;
            let mut r = (xf - nfc) * (fx - ffulc);
            let mut q = (xf - fulc) * (fx - fnfc);
            let mut p = (xf - fulc) * q - (xf - nfc) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            r = e;
            e = rat;

            if p.abs() < (0.5 * q * r).abs() && p > q * (a - xf) && p < q * (b - xf) {
                rat = p / q;
                let x = xf + rat;
                if (x - a) < tol2 || (b - x) < tol2 {
                    rat = tol1 * sign_or_one(xm - xf);
                }
            } else {
                golden = true;
            }
        }

        if golden {
            e = if xf >= xm { a - xf } else { b - xf };
            rat = golden_mean * e;
        }

        let x = xf + sign_or_one(rat) * rat.abs().max(tol1);
        let fu = f(x)?;
        evals += 1;

        if fu <= fx {
            if x >= xf {
                a = xf;
            } else {
                b = xf;
            }
            fulc = nfc;
            ffulc = fnfc;
            nfc = xf;
            fnfc = fx;
            xf = x;
            fx = fu;
        } else {
            if x < xf {
                a = x;
            } else {
                b = x;
            }
            if fu <= fnfc || nfc == xf {
                fulc = nfc;
                ffulc = fnfc;
                nfc = x;
                fnfc = fu;
            } else if fu <= ffulc || fulc == xf || fulc == nfc {
                fulc = x;
                ffulc = fu;
            }
        }

        xm = 0.5 * (a + b);
        tol1 = sqrt_eps * xf.abs() + MINIMIZE_XATOL / 3.0;
        tol2 = 2.0 * tol1;

        if evals >= MINIMIZE_MAX_EVAL {
            return Err(SearchFailure::NoConvergence { iterations: evals });
        }
    }

    Ok(xf)
}

fn sign_or_one(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}
