// AMDC controller board interface
//
// Provides:
// - Line-oriented serial command link with log dumps
// - CRAMB radial and axial command set

pub mod cramb;
mod link;

pub use cramb::{Cramb, AXIAL_INVERTERS, RADIAL_INVERTERS};
pub use link::{AmdcError, AmdcLink, LinkSettings, LogSample, Result};
