//! Ratify Solver - Linear Arithmetic Decision Core
//!
//! An online, incremental decision procedure for quantifier-free linear
//! rational and integer arithmetic, coupled with the shared variable
//! partition and disequality engine that drives Nelson-Oppen style equality
//! propagation:
//! - [`partition::Partition`] - union-find over variables with justified edges
//! - [`diseq::DiseqSet`] - disequalities between canonical representatives
//! - [`simplex::Simplex`] - two solution sets with slack-variable pivoting,
//!   zero-analysis inference, Gomory cuts and sup/inf queries
//! - [`propagator::Engine`] - the fact queue, speculative branching and the
//!   Diophantine disequality segment search
//! - [`context::Context`] - the stateful facade (`process`, `resolve`,
//!   `can`, `sup`, `inf`, `find`, `inv`, `save`, `restore`)

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod diseq;
pub mod formula;
pub mod partition;
pub mod propagator;
pub mod simplex;
pub mod solution;
pub mod theory;

pub use context::Context;
pub use formula::{Atom, Formula};
pub use propagator::{Engine, EngineConfig, Fact, PropagatorStats};
pub use simplex::{Extremum, Simplex, SimplexStats};
pub use theory::{ShostakTheory, TheoryId};
