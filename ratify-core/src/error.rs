//! Error taxonomy of the decision procedure.

use crate::justify::Justification;
use thiserror::Error;

/// Errors raised by the solver core.
///
/// `Inconsistent` carries the dependency set of the refutation and unwinds
/// through the propagator until a speculative branch or the facade catches
/// it. `Unbounded` is internal to maximisation and is converted to an
/// explicit answer at the API boundary. `NotFound` reports an absent binding
/// and is not a failure of the solver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatifyError {
    /// An assertion is refuted; the payload is the unsat core.
    #[error("inconsistent: refuted by atoms {0:?}")]
    Inconsistent(Justification),
    /// The maximised objective has no finite upper bound.
    #[error("objective is unbounded")]
    Unbounded,
    /// The queried variable or term has no binding.
    #[error("no binding found")]
    NotFound,
}

impl RatifyError {
    /// The unsat core of an `Inconsistent` error.
    pub fn core(&self) -> Option<&Justification> {
        match self {
            RatifyError::Inconsistent(core) => Some(core),
            _ => None,
        }
    }
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RatifyError>;
