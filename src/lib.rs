// Force allocation and bench tooling for the CRAMB magnetic bearing

pub mod amdc;
pub mod bearing;
pub mod cli;
pub mod config;
pub mod error;
pub mod logs;
pub mod messages;
pub mod queue;
