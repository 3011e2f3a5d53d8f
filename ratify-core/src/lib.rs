//! Ratify Core - Variables, Justifications and Status Flags
//!
//! This crate provides the foundational types shared by the ratify decision
//! procedure:
//! - Ordered variable handles with kind tags and a [`VarTable`] for metadata
//! - Dependency sets ([`Justification`]) tracking which asserted atoms a
//!   derived fact follows from
//! - The error taxonomy (`Inconsistent`, `Unbounded`, `NotFound`)
//! - Sat/Unsat/Unknown status and three-valued query answers

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod justify;
pub mod status;
pub mod var;

pub use error::{RatifyError, Result};
pub use justify::{AtomId, Justification};
pub use status::{Answer, Status};
pub use var::{Dom, Var, VarKind, VarTable};
