// Inverse force allocation: requested force -> per-pole control excitation
//
// The forward law is quadratic in the excitation, so each force has up to four
// excitations producing it. They are found as the real roots of a depressed
// quartic in one space-vector coordinate, paired with the other coordinate by
// back-substitution, then narrowed to one by the minimum-norm rule.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::force_law::{ForceVector, Formulation};
use super::model::BearingModel;
use super::quartic::RootStrategy;
use super::space_vector::{sv_to_vec3, PoleVector, SpaceVector};
use crate::config::CANDIDATE_TOLERANCE;
use crate::error::{AllocationError, Result};
use crate::messages::{AllocationReport, CandidateReport};

/// Units of the reported control currents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentUnits {
    #[default]
    Amps,
    AmpereTurns,
}

/// Force allocator for one bearing configuration
///
/// Holds no mutable state; every method is a pure function of the model,
/// the root strategy and its arguments.
#[derive(Debug, Clone)]
pub struct ForceAllocator<M> {
    model: M,
    strategy: RootStrategy,
}

impl<M: BearingModel> ForceAllocator<M> {
    pub fn new(model: M, strategy: RootStrategy) -> Self {
        Self { model, strategy }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn strategy(&self) -> RootStrategy {
        self.strategy
    }

    /// Candidate excitation space vectors for a requested force
    ///
    /// A zero magnitude yields the zero vector as the only candidate.
    pub fn inverse(&self, direction_deg: f64, magnitude: f64) -> Result<Vec<SpaceVector>> {
        self.solve(direction_deg, magnitude).map(|(_, svs)| svs)
    }

    /// Candidate space vectors together with the formulation that produced them
    pub fn solve(
        &self,
        direction_deg: f64,
        magnitude: f64,
    ) -> Result<(Formulation, Vec<SpaceVector>)> {
        check_request(direction_deg, magnitude)?;
        let preferred = Formulation::for_direction(direction_deg);
        if magnitude == 0.0 {
            return Ok((preferred, vec![SpaceVector::new(0.0, 0.0)]));
        }

        let (fx, fy) = ForceVector::new(direction_deg, magnitude).components();
        match self.solve_with(preferred, fx, fy)? {
            Some(svs) => Ok((preferred, svs)),
            None => {
                // a zero imaginary root cannot be back-substituted
                warn!(
                    "Singular back-substitution at {}°, re-solving real axis first",
                    direction_deg
                );
                let svs = self
                    .solve_with(Formulation::RealFirst, fx, fy)?
                    .unwrap_or_default(); // real-first never reports None
                Ok((Formulation::RealFirst, svs))
            }
        }
    }

    /// `None` if an imaginary-first root could not be paired
    ///
    /// Each paired root is Newton-polished against the forward law, dropped
    /// if it still misses the target, and merged with any earlier candidate
    /// it converged onto. The linear solution `F / linear` is polished the
    /// same way and stands in for a small root the quartic got wrong.
    fn solve_with(
        &self,
        formulation: Formulation,
        fx: f64,
        fy: f64,
    ) -> Result<Option<Vec<SpaceVector>>> {
        let law = self.model.force_law();
        let target = SpaceVector::new(fx, fy);
        let roots = law.quartic(formulation, fx, fy).real_roots(self.strategy)?;

        let mut seeds = Vec::with_capacity(roots.len() + 1);
        for root in roots {
            match law.pair(formulation, fy, root) {
                Some(sv) => seeds.push(sv),
                None if formulation == Formulation::ImaginaryFirst => return Ok(None),
                None => debug!("Dropping unpairable root {:.6e} ({:?})", root, formulation),
            }
        }
        seeds.push(target / law.linear);

        let mut svs: Vec<SpaceVector> = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let sv = law.refine(seed, target);
            if !law.reproduces(sv, target) {
                debug!("Dropping candidate seeded at |sv|={:.6e}: force misses", seed.norm());
                continue;
            }
            let duplicate = svs.iter().any(|known| {
                (known - sv).norm() <= CANDIDATE_TOLERANCE * known.norm().max(sv.norm())
            });
            if !duplicate {
                svs.push(sv);
            }
        }
        debug!(
            "Fx={:.4} Fy={:.4}: {} candidates via {:?}",
            fx,
            fy,
            svs.len(),
            formulation
        );
        Ok(Some(svs))
    }

    /// Candidate per-pole excitations (all of them, saturated or not)
    pub fn candidates(&self, direction_deg: f64, magnitude: f64) -> Result<Vec<PoleVector>> {
        Ok(self
            .inverse(direction_deg, magnitude)?
            .into_iter()
            .map(sv_to_vec3)
            .collect())
    }

    /// Candidate control excitations, optionally dropping saturated ones
    pub fn control_excitation(
        &self,
        direction_deg: f64,
        magnitude: f64,
        check_saturation: bool,
    ) -> Result<Vec<PoleVector>> {
        let mut candidates = self.candidates(direction_deg, magnitude)?;
        if check_saturation {
            candidates.retain(|e| !self.model.is_saturated(e));
        }
        Ok(candidates)
    }

    /// Candidate total pole fields (control excitation + bias)
    pub fn total_fields(
        &self,
        direction_deg: f64,
        magnitude: f64,
        check_saturation: bool,
    ) -> Result<Vec<PoleVector>> {
        let bias = self.model.bias();
        Ok(self
            .control_excitation(direction_deg, magnitude, check_saturation)?
            .into_iter()
            .map(|e| e.add_scalar(bias))
            .collect())
    }

    /// Minimum-norm control currents producing the requested force
    ///
    /// Returns `NoFeasibleSolution` when every candidate is complex or
    /// (with `check_saturation`) saturated.
    pub fn control_currents(
        &self,
        direction_deg: f64,
        magnitude: f64,
        units: CurrentUnits,
        check_saturation: bool,
    ) -> Result<PoleVector> {
        let excitations = self.control_excitation(direction_deg, magnitude, check_saturation)?;
        let currents: Vec<PoleVector> = excitations
            .iter()
            .map(|e| e * self.model.amps_per_unit())
            .collect();
        let selected =
            select_minimum_norm(&currents).ok_or(AllocationError::NoFeasibleSolution {
                direction: direction_deg,
                magnitude,
            })?;

        Ok(match units {
            CurrentUnits::Amps => selected,
            CurrentUnits::AmpereTurns => selected * self.model.turns(),
        })
    }

    /// Force produced by a per-pole control excitation
    pub fn force(&self, excitation: &PoleVector) -> ForceVector {
        self.model.force_law().force(excitation)
    }

    /// Force produced by per-pole control currents (A)
    pub fn force_from_currents(&self, currents: &PoleVector) -> ForceVector {
        self.force(&(currents / self.model.amps_per_unit()))
    }

    pub fn is_saturated(&self, excitation: &PoleVector) -> bool {
        self.model.is_saturated(excitation)
    }

    /// Every candidate for a force with the field and force it produces
    pub fn report(&self, direction_deg: f64, magnitude: f64) -> Result<AllocationReport> {
        let (formulation, svs) = self.solve(direction_deg, magnitude)?;
        let bias = self.model.bias();
        let candidates: Vec<CandidateReport> = svs
            .into_iter()
            .map(|sv| {
                let excitation = sv_to_vec3(sv);
                CandidateReport {
                    space_vector: (sv.re, sv.im),
                    control: excitation.into(),
                    total_field: excitation.add_scalar(bias).into(),
                    force: self.force(&excitation),
                    saturated: self.model.is_saturated(&excitation),
                }
            })
            .collect();
        let selected = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.saturated)
            .min_by(|(_, a), (_, b)| a.control_norm().total_cmp(&b.control_norm()))
            .map(|(i, _)| i);

        Ok(AllocationReport {
            request: ForceVector::new(direction_deg, magnitude),
            formulation,
            candidates,
            selected,
        })
    }
}

/// The candidate with the smallest Euclidean norm
pub fn select_minimum_norm(candidates: &[PoleVector]) -> Option<PoleVector> {
    candidates
        .iter()
        .min_by(|a, b| a.norm().total_cmp(&b.norm()))
        .copied()
}

fn check_request(direction_deg: f64, magnitude: f64) -> Result<()> {
    if !direction_deg.is_finite() {
        return Err(AllocationError::InvalidParameter {
            name: "direction",
            reason: format!("must be finite, got {}", direction_deg),
        });
    }
    if !(magnitude.is_finite() && magnitude >= 0.0) {
        return Err(AllocationError::InvalidParameter {
            name: "magnitude",
            reason: format!("must be finite and non-negative, got {}", magnitude),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bearing::{CurveFitBearing, PhysicalBearing};
    use approx::assert_relative_eq;

    fn curve_fit(strategy: RootStrategy) -> ForceAllocator<CurveFitBearing> {
        ForceAllocator::new(CurveFitBearing::default(), strategy)
    }

    #[test]
    fn test_zero_magnitude_returns_zero_vector() {
        let alloc = curve_fit(RootStrategy::Numeric);
        for alpha in [0.0, 30.0, 90.0, 180.0, 271.5] {
            let svs = alloc.inverse(alpha, 0.0).unwrap();
            assert_eq!(svs, vec![SpaceVector::new(0.0, 0.0)]);
        }
        let currents = alloc
            .control_currents(45.0, 0.0, CurrentUnits::Amps, true)
            .unwrap();
        assert_eq!(currents, PoleVector::zeros());
    }

    #[test]
    fn test_golden_curve_fit_ampere_turns() {
        let expected = PoleVector::new(98.718_390_981_702, 6.111_202_899_970, -104.829_593_881_673);
        for strategy in [RootStrategy::Numeric, RootStrategy::Analytic] {
            let got = curve_fit(strategy)
                .control_currents(30.0, 100.0, CurrentUnits::AmpereTurns, true)
                .unwrap();
            assert_relative_eq!(got, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_golden_curve_fit_has_four_candidates() {
        let svs = curve_fit(RootStrategy::Numeric).inverse(30.0, 100.0).unwrap();
        assert_eq!(svs.len(), 4);
    }

    #[test]
    fn test_minimum_norm_is_selected() {
        let alloc = curve_fit(RootStrategy::Numeric);
        let candidates = alloc.candidates(30.0, 100.0).unwrap();
        let chosen = alloc
            .control_currents(30.0, 100.0, CurrentUnits::Amps, false)
            .unwrap();
        let norms: Vec<f64> = candidates.iter().map(|c| c.norm()).collect();
        assert!(norms.iter().filter(|&&n| n > chosen.norm() + 1e-9).count() >= 2);
        for n in norms {
            assert!(chosen.norm() <= n + 1e-12);
        }
    }

    #[test]
    fn test_select_minimum_norm_hand_built() {
        let big = PoleVector::new(3.0, -1.0, -2.0);
        let small = PoleVector::new(0.2, 0.1, -0.3);
        assert_eq!(select_minimum_norm(&[big, small]), Some(small));
        assert_eq!(select_minimum_norm(&[small, big]), Some(small));
        assert_eq!(select_minimum_norm(&[]), None);
    }

    fn assert_reproduces<M: BearingModel>(alloc: &ForceAllocator<M>, alpha: f64, mag: f64) {
        let currents = alloc
            .control_currents(alpha, mag, CurrentUnits::Amps, true)
            .unwrap();
        let force = alloc.force_from_currents(&currents);
        assert_relative_eq!(force.magnitude, mag, max_relative = 1e-8);
        let err = (force.direction_deg - alpha).rem_euclid(360.0);
        assert!(
            err.min(360.0 - err) < 1e-6,
            "{:?} at {} N: {}° vs {}°",
            alloc.strategy(),
            mag,
            force.direction_deg,
            alpha
        );
    }

    #[test]
    fn test_forward_inverse_consistency() {
        let magnitudes = [1e-3, 1e-2, 0.1, 1.0, 50.0, 150.0, 400.0];
        for strategy in [RootStrategy::Numeric, RootStrategy::Analytic] {
            let curve = curve_fit(strategy);
            let physical = ForceAllocator::new(PhysicalBearing::default(), strategy);
            for alpha in [5.0, 30.0, 75.0, 135.0, 200.0, 250.0, 300.0, 345.0] {
                for mag in magnitudes {
                    assert_reproduces(&curve, alpha, mag);
                    assert_reproduces(&physical, alpha, mag);
                }
            }
        }
    }

    #[test]
    fn test_small_forces_pick_the_small_field_solution() {
        // the wanted solution is close to the linear one, F / C1
        for (strategy, mag) in [
            (RootStrategy::Numeric, 1e-6),
            (RootStrategy::Numeric, 1e-4),
            (RootStrategy::Analytic, 1e-3),
            (RootStrategy::Analytic, 1e-2),
        ] {
            let alloc = curve_fit(strategy);
            for alpha in (0..360).map(|k| k as f64 + 0.5) {
                assert_reproduces(&alloc, alpha, mag);
                let currents = alloc
                    .control_currents(alpha, mag, CurrentUnits::Amps, true)
                    .unwrap();
                let sv = crate::bearing::space_vec(&currents);
                assert!(sv.norm() < 1.01 * mag / 175.677, "{:?} {}°", strategy, alpha);
            }
        }
    }

    #[test]
    fn test_axis_directions_use_real_first() {
        let alloc = curve_fit(RootStrategy::Numeric);
        for alpha in [0.0, 0.4, 180.0, 359.7] {
            let (formulation, svs) = alloc.solve(alpha, 80.0).unwrap();
            assert_eq!(formulation, Formulation::RealFirst);
            assert!(!svs.is_empty());
            let currents = alloc
                .control_currents(alpha, 80.0, CurrentUnits::Amps, true)
                .unwrap();
            let force = alloc.force_from_currents(&currents);
            assert_relative_eq!(force.magnitude, 80.0, epsilon = 1e-6);
            let err = (force.direction_deg - alpha).rem_euclid(360.0);
            assert!(err.min(360.0 - err) < 1e-6, "{} vs {}", force.direction_deg, alpha);
        }
    }

    #[test]
    fn test_physical_model_matches_curve_fit_prototype() {
        // same prototype expressed through geometry: within the fit error
        let zeta = crate::config::DEFAULT_ZETA;
        let bearing =
            PhysicalBearing::new(0.70804 / zeta, zeta, 75.0, 0.001, 0.0401, 0.0165, 308.0).unwrap();
        let alloc = ForceAllocator::new(bearing, RootStrategy::Numeric);
        let got = alloc
            .control_currents(30.0, 100.0, CurrentUnits::AmpereTurns, true)
            .unwrap();
        let expected = PoleVector::new(98.718_596_097_887, 6.111_254_635_416, -104.829_850_733_303);
        assert_relative_eq!(got, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_all_saturated_is_no_feasible_solution() {
        let alloc = ForceAllocator::new(PhysicalBearing::default(), RootStrategy::Numeric);
        let too_big = 2.0 * crate::bearing::Saturable::hexagon_bound(alloc.model());
        let err = alloc
            .control_currents(30.0, too_big, CurrentUnits::Amps, true)
            .unwrap_err();
        assert!(matches!(err, AllocationError::NoFeasibleSolution { .. }));
        // without the saturation check the quartic still has real roots
        assert!(alloc
            .control_currents(30.0, too_big, CurrentUnits::Amps, false)
            .is_ok());
    }

    #[test]
    fn test_rejects_negative_magnitude() {
        let alloc = curve_fit(RootStrategy::Numeric);
        assert!(matches!(
            alloc.inverse(10.0, -1.0),
            Err(AllocationError::InvalidParameter { .. })
        ));
        assert!(alloc.inverse(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_report_marks_selected_candidate() {
        let alloc = curve_fit(RootStrategy::Numeric);
        let report = alloc.report(30.0, 100.0).unwrap();
        assert_eq!(report.candidates.len(), 4);
        let idx = report.selected.unwrap();
        let chosen = PoleVector::from(report.candidates[idx].control) * 308.0;
        assert_relative_eq!(chosen[0], 98.718_390_981_702, epsilon = 1e-6);
        for c in &report.candidates {
            assert_relative_eq!(c.force.magnitude, 100.0, epsilon = 1e-6);
        }
    }
}
