//! Error taxonomy for scheduling and reallocation operations.

use crate::constraints::HardViolation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    /// Malformed or missing domain data. Rejected before solving.
    #[error("invalid input: {0}")]
    Input(String),

    /// The hard constraints cannot all hold. Carries the violated set.
    #[error("no feasible schedule: {} hard constraint(s) violated", violations.len())]
    Infeasible { violations: Vec<HardViolation> },

    /// Lost an optimistic-lock race on an assignment, or a second
    /// optimization was requested for a key already in flight.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Late or ineligible vote. Non-fatal; the ballot is unaffected.
    #[error("vote rejected: {0}")]
    Voting(String),

    /// Transition attempted from an invalid state. Caller misuse.
    #[error("invalid state: {0}")]
    State(String),

    /// Should not occur in normal operation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, SolverError>;
