// Error types for the force-allocation engine

/// Failures surfaced by the allocator and the rating search
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    #[error("No feasible excitation for force {magnitude} at {direction}°")]
    NoFeasibleSolution { direction: f64, magnitude: f64 },

    #[error("Auxiliary cubic root is zero for p={p}, q={q}, r={r}")]
    DegenerateAuxiliaryRoot { p: f64, q: f64, r: f64 },

    #[error("Maximum force search at {direction}° failed after {iterations} iterations")]
    RatingSearchFailed { direction: f64, iterations: usize },

    #[error("Invalid bearing parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, AllocationError>;
