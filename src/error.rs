//! Error kinds for preprocessing, solving, and job execution.

use thiserror::Error;

/// Failures raised while building the slot model or running ICPMP (spec §7).
#[derive(Debug, Error, Clone)]
pub enum PreprocessingError {
    #[error("requirement {requirement_id}: need at least {need} eligible employees, have {have}")]
    InsufficientEmployees {
        requirement_id: String,
        need: usize,
        have: usize,
    },

    #[error("requirement {requirement_id}: eligibility filter left no employees")]
    EligibilityEmpty { requirement_id: String },

    /// Recoverable: caller records a warning and the full pool is passed through.
    #[error("requirement {requirement_id}: no feasible employee count in [{lb}, {ub}]")]
    NoFeasibleCount {
        requirement_id: String,
        lb: usize,
        ub: usize,
    },
}

/// Tagged outcome of a CP-style solve attempt. `Infeasible` and `Unknown`
/// are not errors: the job still completes (spec §4.6, §7).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

/// Top-level error type surfaced to a job's `failed` state.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),

    #[error("solver error: {0}")]
    Solver(String),

    #[error("estimated variable count {estimated} exceeds ceiling {ceiling}")]
    CapacityExceeded { estimated: usize, ceiling: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl RosterError {
    /// Sanitized string suitable for storing on a `Job::error` field — no
    /// internal paths or debug representations, matching the propagation
    /// policy in spec §7.
    pub fn sanitized(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, RosterError>;
