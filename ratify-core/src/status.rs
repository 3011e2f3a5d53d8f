//! Status flags and three-valued query answers.

use crate::justify::Justification;

/// Outcome of processing the accumulated context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status<W> {
    /// The context is satisfiable; the witness is the processed formula.
    Sat(W),
    /// The context is refuted; the payload is the unsat core.
    Unsat(Justification),
    /// Undetermined, e.g. pending propositional case splits.
    Unknown,
}

impl<W> Status<W> {
    /// Whether the status is `Sat`.
    pub fn is_sat(&self) -> bool {
        matches!(self, Status::Sat(_))
    }

    /// Whether the status is `Unsat`.
    pub fn is_unsat(&self) -> bool {
        matches!(self, Status::Unsat(_))
    }

    /// The unsat core, when `Unsat`.
    pub fn core(&self) -> Option<&Justification> {
        match self {
            Status::Unsat(core) => Some(core),
            _ => None,
        }
    }
}

/// Three-valued answer to an entailment query, with justification on the
/// determined branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Entailed, with the dependency set of the derivation.
    Yes(Justification),
    /// Refuted, with the dependency set of the refutation.
    No(Justification),
    /// Not determined by the current context.
    Unknown,
}

impl Answer {
    /// Whether the answer is `Yes`.
    pub fn is_yes(&self) -> bool {
        matches!(self, Answer::Yes(_))
    }

    /// Whether the answer is `No`.
    pub fn is_no(&self) -> bool {
        matches!(self, Answer::No(_))
    }
}
