// Bearing defaults, solver tolerances, serial settings
use std::f64::consts::SQRT_2;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bearing::{
    BearingModel, CurveFitBearing, PhysicalBearing, PoleVector, QuadraticForceLaw, RootStrategy,
};
use crate::error::AllocationError;

// Physical model defaults
pub const DEFAULT_BMAX: f64 = 1.16; // T
pub const DEFAULT_ZETA: f64 = (1.0 + 1.0 / SQRT_2) / 3.0; // optimal bias fraction
pub const DEFAULT_POLE_SPAN_DEG: f64 = 110.0;
pub const DEFAULT_AIRGAP: f64 = 0.001; // m
pub const DEFAULT_ROTOR_RADIUS: f64 = 0.0401; // m
pub const DEFAULT_LAMINATION_LENGTH: f64 = 0.0165; // m
pub const DEFAULT_TURNS: f64 = 1000.0;

// Curve-fit model defaults (regressed from the CRAMB prototype)
pub const DEFAULT_C1: f64 = 175.677;
pub const DEFAULT_C2: f64 = 48.016;
pub const DEFAULT_CURVE_FIT_TURNS: f64 = 308.0;

/// Roots whose imaginary part is below this are treated as real
pub const IMAGINARY_TOLERANCE: f64 = 1e-8;

/// Directions closer than this to the pole-1 axis are solved real-axis first
pub const SINGULAR_AXIS_MARGIN_DEG: f64 = 1.0;

/// Below this magnitude a root or auxiliary root counts as zero
pub const ZERO_ROOT_TOLERANCE: f64 = 1e-12;

/// Newton steps spent polishing each inverse candidate against the forward law
pub const REFINE_MAX_STEPS: usize = 50;

/// Relative forward-force residual a candidate must meet; also the
/// distance under which two candidates are the same solution
pub const CANDIDATE_TOLERANCE: f64 = 1e-9;

// Rating search
pub const RATING_SEARCH_LOWER: f64 = 0.1;
pub const RATING_BOUND_FACTOR: f64 = 1.1;
pub const NEWTON_SEED: f64 = 1.0;
pub const NEWTON_MAX_ITER: usize = 100;
pub const RATED_SPAN_DEG: (f64, f64) = (0.0, 60.0);

// AMDC serial link
pub const AMDC_BAUDRATE: u32 = 115_200;
pub const AMDC_READ_TIMEOUT: Duration = Duration::from_millis(10);
pub const AMDC_CMD_DELAY: Duration = Duration::from_millis(500);
pub const AMDC_CHAR_DELAY: Duration = Duration::from_millis(1);
pub const AMDC_ALLOWED_EMPTY_READS: usize = 10;
pub const AMDC_ECHO_PREFIX: &str = "\t> ";
pub const AMDC_LOG_END: &str = "-------END-------";

// Force/torque sensor logs
pub const LOG_HEADER_LINES: usize = 38;
pub const LOG_COLUMNS: [&str; 6] = ["My", "Fz", "Fx", "Fy", "Mx", "Mz"];

/// Errors loading a bearing description
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bearing(#[from] AllocationError),
}

/// Bearing description as stored on disk
///
/// ```json
/// { "model": "curve_fit", "c1": 175.677, "c2": 48.016, "turns": 308 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum BearingConfig {
    Physical {
        #[serde(default = "default_bmax")]
        bmax: f64,
        #[serde(default = "default_zeta")]
        zeta: f64,
        #[serde(default = "default_pole_span")]
        pole_span_deg: f64,
        #[serde(default = "default_airgap")]
        airgap: f64,
        #[serde(default = "default_rotor_radius")]
        rotor_radius: f64,
        #[serde(default = "default_lamination_length")]
        lamination_length: f64,
        #[serde(default = "default_turns")]
        turns: f64,
        /// Optional (C1, C2) overlay replacing the geometric constants
        #[serde(default)]
        curve_fit: Option<(f64, f64)>,
    },
    CurveFit {
        #[serde(default = "default_c1")]
        c1: f64,
        #[serde(default = "default_c2")]
        c2: f64,
        #[serde(default = "default_curve_fit_turns")]
        turns: f64,
    },
}

fn default_bmax() -> f64 {
    DEFAULT_BMAX
}
fn default_zeta() -> f64 {
    DEFAULT_ZETA
}
fn default_pole_span() -> f64 {
    DEFAULT_POLE_SPAN_DEG
}
fn default_airgap() -> f64 {
    DEFAULT_AIRGAP
}
fn default_rotor_radius() -> f64 {
    DEFAULT_ROTOR_RADIUS
}
fn default_lamination_length() -> f64 {
    DEFAULT_LAMINATION_LENGTH
}
fn default_turns() -> f64 {
    DEFAULT_TURNS
}
fn default_c1() -> f64 {
    DEFAULT_C1
}
fn default_c2() -> f64 {
    DEFAULT_C2
}
fn default_curve_fit_turns() -> f64 {
    DEFAULT_CURVE_FIT_TURNS
}

impl Default for BearingConfig {
    fn default() -> Self {
        Self::CurveFit {
            c1: DEFAULT_C1,
            c2: DEFAULT_C2,
            turns: DEFAULT_CURVE_FIT_TURNS,
        }
    }
}

/// A bearing built from a [`BearingConfig`]
#[derive(Debug, Clone)]
pub enum Bearing {
    Physical(PhysicalBearing),
    CurveFit(CurveFitBearing),
}

impl BearingModel for Bearing {
    fn force_law(&self) -> QuadraticForceLaw {
        match self {
            Self::Physical(b) => b.force_law(),
            Self::CurveFit(b) => b.force_law(),
        }
    }

    fn amps_per_unit(&self) -> f64 {
        match self {
            Self::Physical(b) => b.amps_per_unit(),
            Self::CurveFit(b) => b.amps_per_unit(),
        }
    }

    fn turns(&self) -> f64 {
        match self {
            Self::Physical(b) => b.turns(),
            Self::CurveFit(b) => b.turns(),
        }
    }

    fn bias(&self) -> f64 {
        match self {
            Self::Physical(b) => b.bias(),
            Self::CurveFit(b) => b.bias(),
        }
    }

    fn is_saturated(&self, excitation: &PoleVector) -> bool {
        match self {
            Self::Physical(b) => b.is_saturated(excitation),
            Self::CurveFit(b) => b.is_saturated(excitation),
        }
    }
}

impl fmt::Display for Bearing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physical(b) => fmt::Display::fmt(b, f),
            Self::CurveFit(b) => fmt::Display::fmt(b, f),
        }
    }
}

impl BearingConfig {
    /// Read a bearing description from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Construct the bearing model this description names
    pub fn build(&self) -> Result<Bearing, ConfigError> {
        let bearing = match *self {
            Self::Physical {
                bmax,
                zeta,
                pole_span_deg,
                airgap,
                rotor_radius,
                lamination_length,
                turns,
                curve_fit,
            } => {
                let physical = PhysicalBearing::new(
                    bmax,
                    zeta,
                    pole_span_deg,
                    airgap,
                    rotor_radius,
                    lamination_length,
                    turns,
                )?;
                let physical = match curve_fit {
                    Some((c1, c2)) => physical.with_curve_fit(c1, c2)?,
                    None => physical,
                };
                Bearing::Physical(physical)
            }
            Self::CurveFit { c1, c2, turns } => {
                Bearing::CurveFit(CurveFitBearing::new(c1, c2, turns)?)
            }
        };
        Ok(bearing)
    }
}

/// Selects the quartic root strategy from a CLI flag
pub fn root_strategy(analytic: bool) -> RootStrategy {
    if analytic {
        RootStrategy::Analytic
    } else {
        RootStrategy::Numeric
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_fit_defaults_fill_missing_fields() {
        let config: BearingConfig = serde_json::from_str(r#"{ "model": "curve_fit" }"#).unwrap();
        assert_eq!(config, BearingConfig::default());
    }

    #[test]
    fn test_physical_config_builds() {
        let config: BearingConfig = serde_json::from_str(
            r#"{ "model": "physical", "pole_span_deg": 75.0, "turns": 308 }"#,
        )
        .unwrap();
        match config.build().unwrap() {
            Bearing::Physical(b) => {
                assert_eq!(b.turns(), 308.0);
                assert!((b.pole_span_deg() - 75.0).abs() < 1e-12);
            }
            Bearing::CurveFit(_) => panic!("expected physical bearing"),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = BearingConfig::CurveFit {
            c1: 175.0,
            c2: 0.0,
            turns: 308.0,
        };
        assert!(matches!(config.build(), Err(ConfigError::Bearing(_))));
    }

    #[test]
    fn test_unknown_model_is_a_json_error() {
        let result: Result<BearingConfig, _> = serde_json::from_str(r#"{ "model": "hexapole" }"#);
        assert!(result.is_err());
    }
}
