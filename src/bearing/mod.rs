// Force allocation for a 3-pole combined radial-axial magnetic bearing
//
// Provides:
// - Space-vector transforms between pole quantities and complex vectors
// - The quadratic force law and its inverse via a depressed quartic
// - Physical and curve-fit bearing parametrizations
// - Minimum-norm current selection, saturation checks and force rating

mod allocator;
mod curve_fit;
mod force_law;
mod model;
pub mod optimize;
mod physical;
pub mod quartic;
mod rating;
pub mod space_vector;

pub use allocator::{select_minimum_norm, CurrentUnits, ForceAllocator};
pub use curve_fit::CurveFitBearing;
pub use force_law::{normalize_degrees, ForceVector, Formulation, QuadraticForceLaw};
pub use model::{BearingModel, Saturable};
pub use physical::{PhysicalBearing, MU_0};
pub use quartic::{DepressedQuartic, RootStrategy};
pub use space_vector::{peak_and_angle, space_vec, sv_to_vec3, PoleVector, SpaceVector};
