//! The stateful facade.
//!
//! A [`Context`] owns the current configuration and a status flag. Formulas
//! are classified and pushed through the propagator; compound propositional
//! structure parks a pending case split and leaves the status `Unknown`
//! until [`Context::resolve`] forces a decision by exhaustive splitting
//! over snapshots.

use ratify_core::{Answer, AtomId, Dom, Justification, RatifyError, Result, Status, Var, VarTable};
use ratify_math::Polynomial;

use crate::formula::{Atom, Formula};
use crate::propagator::{Engine, EngineConfig, Fact, PropagatorStats, Snapshot};
use crate::simplex::{Extremum, SimplexStats};
use crate::theory::TheoryId;

#[derive(Clone)]
struct SavedState {
    snapshot: Snapshot,
    atoms_len: usize,
    pending: Vec<(Formula, Justification)>,
    status: Status<Formula>,
}

/// The stateful decision-procedure API.
pub struct Context {
    engine: Engine,
    atoms: Vec<Formula>,
    pending: Vec<(Formula, Justification)>,
    status: Status<Formula>,
    saves: Vec<SavedState>,
    config: EngineConfig,
}

impl Context {
    /// Create a context with default configuration.
    pub fn new() -> Self {
        Context::with_config(EngineConfig::default())
    }

    /// Create a context with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Context {
            engine: Engine::new(config.clone()),
            atoms: Vec::new(),
            pending: Vec::new(),
            status: Status::Sat(Formula::True),
            saves: Vec::new(),
            config,
        }
    }

    /// Introduce (or look up) a user variable.
    pub fn declare(&mut self, name: &str, dom: Option<Dom>) -> Var {
        self.engine.vars_mut().external(name, dom)
    }

    /// The variable table.
    pub fn vars(&self) -> &VarTable {
        self.engine.vars()
    }

    /// The current status.
    pub fn status(&self) -> &Status<Formula> {
        &self.status
    }

    /// The asserted formulas, indexable by the atoms of an unsat core.
    pub fn atoms(&self) -> &[Formula] {
        &self.atoms
    }

    /// The formulas an unsat core refers to.
    pub fn core_formulas(&self, core: &Justification) -> Vec<&Formula> {
        core.iter()
            .filter_map(|a| self.atoms.get(a.0 as usize))
            .collect()
    }

    /// Solver counters.
    pub fn stats(&self) -> (&SimplexStats, &PropagatorStats) {
        (self.engine.simplex().stats(), self.engine.stats())
    }

    /// Assert a formula and report the resulting status.
    pub fn process(&mut self, phi: Formula) -> Status<Formula> {
        if self.status.is_unsat() {
            return self.status.clone();
        }
        let id = AtomId(self.atoms.len() as u32);
        self.atoms.push(phi.clone());
        let why = Justification::single(id);
        let result = self
            .assert_formula(&phi, &why)
            .and_then(|()| self.engine.drain());
        self.status = match result {
            Err(RatifyError::Inconsistent(core)) => Status::Unsat(core),
            Err(_) => Status::Unknown,
            Ok(()) => {
                if self.pending.is_empty() {
                    Status::Sat(phi)
                } else {
                    Status::Unknown
                }
            }
        };
        self.status.clone()
    }

    fn assert_formula(&mut self, f: &Formula, why: &Justification) -> Result<()> {
        match f {
            Formula::True => Ok(()),
            Formula::False => Err(RatifyError::Inconsistent(why.clone())),
            Formula::Atom(a) => {
                self.push_atom(a, why);
                Ok(())
            }
            Formula::And(fs) => {
                for g in fs {
                    self.assert_formula(g, why)?;
                }
                Ok(())
            }
            Formula::Not(g) => self.assert_formula(&g.negate(), why),
            Formula::Or(_) => {
                self.pending.push((f.clone(), why.clone()));
                Ok(())
            }
        }
    }

    fn push_atom(&mut self, a: &Atom, why: &Justification) {
        match a {
            Atom::Eq(s, t) => self
                .engine
                .push(Fact::Equal(s.clone(), t.clone(), why.clone())),
            Atom::Diseq(s, t) => self
                .engine
                .push(Fact::Diseq(s.clone(), t.clone(), why.clone())),
            Atom::Nonneg(p) => self.engine.push(Fact::Nonneg(p.clone(), why.clone())),
            Atom::Pos(p) => {
                // a > 0 is the pair a ≥ 0, a ≠ 0
                self.engine.push(Fact::Nonneg(p.clone(), why.clone()));
                self.engine
                    .push(Fact::Diseq(p.clone(), Polynomial::zero(), why.clone()));
            }
        }
    }

    fn atom_facts(a: &Atom, why: &Justification) -> Vec<Fact> {
        match a {
            Atom::Eq(s, t) => vec![Fact::Equal(s.clone(), t.clone(), why.clone())],
            Atom::Diseq(s, t) => vec![Fact::Diseq(s.clone(), t.clone(), why.clone())],
            Atom::Nonneg(p) => vec![Fact::Nonneg(p.clone(), why.clone())],
            Atom::Pos(p) => vec![
                Fact::Nonneg(p.clone(), why.clone()),
                Fact::Diseq(p.clone(), Polynomial::zero(), why.clone()),
            ],
        }
    }

    /// Exhaustively case-split the pending propositional structure and
    /// force a `Sat`/`Unsat` decision. May be exponential.
    pub fn resolve(&mut self) -> Status<Formula> {
        if self.status.is_unsat() {
            return self.status.clone();
        }
        if self.pending.is_empty() {
            if !self.status.is_sat() {
                self.status = Status::Sat(Formula::True);
            }
            return self.status.clone();
        }
        match self.split_from(0) {
            Ok(()) => {
                self.pending.clear();
                self.status = Status::Sat(Formula::True);
            }
            Err(core) => self.status = Status::Unsat(core),
        }
        self.status.clone()
    }

    fn split_from(&mut self, i: usize) -> std::result::Result<(), Justification> {
        if i >= self.pending.len() {
            return Ok(());
        }
        let (f, why) = self.pending[i].clone();
        let cases: Vec<Formula> = match f {
            Formula::Or(fs) => fs,
            other => vec![other],
        };
        let mut core = Justification::empty();
        for case in cases {
            let snapshot = self.engine.snapshot();
            let pending_len = self.pending.len();
            let attempt = self
                .assert_formula(&case, &why)
                .and_then(|()| self.engine.drain());
            match attempt {
                Ok(()) => match self.split_from(i + 1) {
                    Ok(()) => return Ok(()),
                    Err(c) => {
                        core.union(&c);
                        self.engine.restore(snapshot);
                        self.pending.truncate(pending_len);
                    }
                },
                Err(RatifyError::Inconsistent(c)) => {
                    core.union(&c);
                    self.engine.restore(snapshot);
                    self.pending.truncate(pending_len);
                }
                Err(_) => {
                    self.engine.restore(snapshot);
                    self.pending.truncate(pending_len);
                }
            }
        }
        Err(core)
    }

    /// Canonical form of a term; no state change observable to the client.
    pub fn can(&mut self, p: &Polynomial) -> Polynomial {
        self.engine.canonize(p).0
    }

    /// The right-hand side assigned to `x` in theory `theta`.
    pub fn find(&mut self, theta: TheoryId, x: Var) -> Result<Polynomial> {
        match theta {
            TheoryId::Arith => self.engine.find(x),
            // sibling solvers are interface-only in this workspace
            _ => Err(RatifyError::NotFound),
        }
    }

    /// The left-hand side whose binding equals `p`.
    pub fn inv(&mut self, p: &Polynomial) -> Result<Var> {
        self.engine.inv(p)
    }

    /// Intern a term under a canonical variable.
    pub fn name(&mut self, p: &Polynomial) -> Var {
        self.engine.name(p)
    }

    /// Least upper bound of a term.
    pub fn sup(&mut self, p: &Polynomial) -> Result<Extremum> {
        self.engine.sup(p)
    }

    /// Greatest lower bound of a term.
    pub fn inf(&mut self, p: &Polynomial) -> Result<Extremum> {
        self.engine.inf(p)
    }

    /// Three-valued validity test.
    ///
    /// Complete on atoms whose canonical form is constant; with
    /// `complete_tests` set, undecided atoms are settled by speculatively
    /// refuting one side.
    pub fn valid(&mut self, phi: &Formula) -> Answer {
        match phi {
            Formula::True => Answer::Yes(Justification::empty()),
            Formula::False => Answer::No(Justification::empty()),
            Formula::Atom(atom) => self.valid_atom(atom),
            _ => Answer::Unknown,
        }
    }

    fn valid_atom(&mut self, atom: &Atom) -> Answer {
        use num_traits::{Signed, Zero};
        let constant_answer = match atom {
            Atom::Eq(s, t) | Atom::Diseq(s, t) => {
                let (d, j) = self.engine.canonize(&s.sub(t));
                d.as_constant().map(|c| {
                    let zero = c.is_zero();
                    let eq = matches!(atom, Atom::Eq(..));
                    if zero == eq {
                        Answer::Yes(j)
                    } else {
                        Answer::No(j)
                    }
                })
            }
            Atom::Nonneg(p) => {
                let (d, j) = self.engine.canonize(p);
                d.as_constant().map(|c| {
                    if c.is_negative() {
                        Answer::No(j)
                    } else {
                        Answer::Yes(j)
                    }
                })
            }
            Atom::Pos(p) => {
                let (d, j) = self.engine.canonize(p);
                d.as_constant().map(|c| {
                    if c.is_positive() {
                        Answer::Yes(j)
                    } else {
                        Answer::No(j)
                    }
                })
            }
        };
        if let Some(answer) = constant_answer {
            return answer;
        }
        if !self.engine.complete_tests() {
            return Answer::Unknown;
        }
        // entailed iff the negation is refutable
        let why = Justification::empty();
        let negated = Self::atom_facts(&atom.negate(), &why);
        match self.engine.probe(negated) {
            Ok(Some(core)) => return Answer::Yes(core),
            Ok(None) => {}
            Err(_) => return Answer::Unknown,
        }
        let direct = Self::atom_facts(atom, &why);
        match self.engine.probe(direct) {
            Ok(Some(core)) => Answer::No(core),
            _ => Answer::Unknown,
        }
    }

    /// Take a snapshot of the whole state; returns a handle for
    /// [`Context::restore`].
    pub fn save(&mut self) -> usize {
        self.saves.push(SavedState {
            snapshot: self.engine.snapshot(),
            atoms_len: self.atoms.len(),
            pending: self.pending.clone(),
            status: self.status.clone(),
        });
        self.saves.len() - 1
    }

    /// Restore a previously saved state. The handle stays valid for
    /// repeated restores.
    pub fn restore(&mut self, handle: usize) -> Result<()> {
        let saved = self.saves.get(handle).cloned().ok_or(RatifyError::NotFound)?;
        self.engine.restore(saved.snapshot);
        self.atoms.truncate(saved.atoms_len);
        self.pending = saved.pending;
        self.status = saved.status;
        Ok(())
    }

    /// Drop all assertions and start over with the same configuration.
    pub fn reset(&mut self) {
        *self = Context::with_config(self.config.clone());
    }

    /// Structural audit of the underlying state; test support.
    pub fn audit(&self) -> bool {
        self.engine.audit()
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}
