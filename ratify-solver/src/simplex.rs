//! The simplex engine over two solution sets.
//!
//! State is a pair `(R, T)`: `R` binds non-slack variables to arbitrary
//! canonical polynomials, `T` is a feasible tableau binding slacks to
//! restricted polynomials whose constant parts never go negative. The two
//! sets are kept in joint solved form: composing into `T` also fuses into
//! the right-hand sides of `R`.
//!
//! Equalities are solved (over the rationals, or with the Diophantine
//! solver when every variable is integer-constrained) and dispatched into
//! `R`, the partition (bare variable pairs) or the tableau via the
//! restricted branch. Nonnegativity facts introduce nonneg slacks.
//! Entailed zero variables are found by the two-phase zero analysis and
//! broadcast as variable equalities with the distinguished zero slack.

use num_rational::BigRational;
use num_traits::{Signed, Zero};
use ratify_core::{Justification, RatifyError, Result, Var, VarTable};
use ratify_math::dioph;
use ratify_math::polynomial::{Monomial, Polynomial, Solution};
use ratify_math::rational::RationalExt;
use rustc_hash::FxHashMap;

use crate::solution::{Binding, Event, SolutionSet};

/// A fact produced by the simplex for the propagator to rebroadcast.
#[derive(Debug)]
pub enum Derived {
    /// Two variables are entailed equal.
    VarEq(Var, Var, Justification),
    /// A Gomory cut: the polynomial is entailed nonnegative.
    Cut(Polynomial, Justification),
}

/// Result of maximisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extremum {
    /// A finite extremal bound, attained by the current configuration.
    Finite(BigRational),
    /// The objective is unbounded.
    Unbounded,
}

/// Counters for the arithmetic core.
#[derive(Debug, Clone, Default)]
pub struct SimplexStats {
    /// Equalities merged.
    pub merges: u64,
    /// Nonnegativity facts processed.
    pub nonnegs: u64,
    /// Pivot operations.
    pub pivots: u64,
    /// Variables inferred zero by the zero analysis.
    pub inferred_zeros: u64,
    /// Gomory cuts emitted.
    pub gomory_cuts: u64,
}

/// The linear arithmetic solution sets `(R, T)`.
#[derive(Clone)]
pub struct Simplex {
    r: SolutionSet,
    t: SolutionSet,
    /// Cross-set index from constant values to a witness left-hand side;
    /// entries are validated lazily against the current bindings.
    cval: FxHashMap<BigRational, Var>,
    zero_var: Var,
    stats: SimplexStats,
}

impl Simplex {
    /// Create an empty state. `zero_var` is the distinguished zero slack
    /// used to broadcast "is zero" facts to the partition.
    pub fn new(zero_var: Var) -> Self {
        Simplex {
            r: SolutionSet::new(),
            t: SolutionSet::new(),
            cval: FxHashMap::default(),
            zero_var,
            stats: SimplexStats::default(),
        }
    }

    /// The regular solution set `R`.
    pub fn regular(&self) -> &SolutionSet {
        &self.r
    }

    /// The tableau `T`.
    pub fn tableau(&self) -> &SolutionSet {
        &self.t
    }

    /// Counters.
    pub fn stats(&self) -> &SimplexStats {
        &self.stats
    }

    /// The binding of `x` in `R ∪ T`.
    pub fn binding_of(&self, x: Var) -> Option<&Binding> {
        if x.is_slack() {
            self.t.get(x)
        } else {
            self.r.get(x)
        }
    }

    /// Remove the binding of `x` from whichever set holds it.
    pub fn remove_binding(&mut self, x: Var) -> Option<Binding> {
        if x.is_slack() {
            self.t.remove(x)
        } else {
            self.r.remove(x)
        }
    }

    /// The left-hand side bound to exactly `p`, searching `R` then `T`.
    pub fn inv_var(&self, p: &Polynomial) -> Option<Var> {
        self.r.inv_lookup(p).or_else(|| self.t.inv_lookup(p))
    }

    /// A variable currently bound to the given constant, if the constant
    /// index has a valid witness.
    pub fn constant_var(&self, value: &BigRational) -> Option<Var> {
        let v = self.cval.get(value).copied()?;
        let valid = self
            .binding_of(v)
            .and_then(|b| b.rhs.as_constant())
            .map_or(false, |c| c == value);
        valid.then_some(v)
    }

    /// Canonicalise `p` through `R ∪ T`. One simultaneous substitution
    /// suffices because the sets are in joint solved form.
    pub fn canon(&self, p: &Polynomial) -> (Polynomial, Justification) {
        let bound: Vec<Var> = p.vars().filter(|v| self.binding_of(*v).is_some()).collect();
        if bound.is_empty() {
            return (p.clone(), Justification::empty());
        }
        let mut out = p.clone();
        let mut why = Justification::empty();
        for v in bound {
            if let Some(b) = self.binding_of(v) {
                out = out.subst(v, &b.rhs);
                why.union(&b.why);
            }
        }
        (out, why)
    }

    fn absorb(&mut self, events: Vec<Event>, out: &mut Vec<Derived>) {
        for event in events {
            match event {
                Event::VarEq { a, b, why } => out.push(Derived::VarEq(a, b, why)),
                Event::Constant { lhs } => {
                    let Some((value, why)) = self
                        .binding_of(lhs)
                        .and_then(|b| b.rhs.as_constant().map(|c| (c.clone(), b.why.clone())))
                    else {
                        continue;
                    };
                    match self.cval.get(&value).copied() {
                        None => {
                            self.cval.insert(value, lhs);
                        }
                        Some(other) if other == lhs => {}
                        Some(other) => {
                            let other_alive = self
                                .binding_of(other)
                                .and_then(|b| b.rhs.as_constant())
                                .map_or(false, |c| *c == value);
                            if other_alive {
                                let owhy = self
                                    .binding_of(other)
                                    .map(|b| b.why.clone())
                                    .unwrap_or_default();
                                out.push(Derived::VarEq(
                                    lhs,
                                    other,
                                    Justification::merged(why, &owhy),
                                ));
                            } else {
                                self.cval.insert(value, lhs);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Compose `x ↦ p` into `R`.
    fn compose_r(&mut self, x: Var, p: Polynomial, why: Justification, out: &mut Vec<Derived>) {
        debug_assert!(!x.is_slack());
        let mut events = Vec::new();
        self.r.compose(x, p, why, &mut events);
        self.absorb(events, out);
    }

    /// Compose `k ↦ p` into `T`, keeping `R` canonical with respect to it.
    fn compose_t(&mut self, k: Var, p: Polynomial, why: Justification, out: &mut Vec<Derived>) {
        debug_assert!(k.is_slack() && p.is_restricted());
        let mut events = Vec::new();
        self.r.fuse(k, &p, &why, &mut events);
        self.t.compose(k, p, why, &mut events);
        self.absorb(events, out);
    }

    /// Substitute `l := rep` through both sets without binding `l`; used by
    /// the engine when the partition merges two variables.
    pub fn fuse_var(
        &mut self,
        l: Var,
        rep: &Polynomial,
        why: &Justification,
        out: &mut Vec<Derived>,
    ) {
        let mut events = Vec::new();
        self.r.fuse(l, rep, why, &mut events);
        if l.is_slack() {
            self.t.fuse(l, rep, why, &mut events);
        }
        self.absorb(events, out);
    }

    /// Intern a canonical non-variable polynomial under a fresh rename
    /// variable in `R`, reusing the inverse index when it is already named.
    pub fn name(
        &mut self,
        p: &Polynomial,
        table: &mut VarTable,
        out: &mut Vec<Derived>,
    ) -> Var {
        let (p, _) = self.canon(p);
        if let Some(v) = p.as_var() {
            return v;
        }
        if let Some(v) = self.inv_var(&p) {
            return v;
        }
        let dom = if p.is_diophantine(table) {
            ratify_core::Dom::Int
        } else {
            ratify_core::Dom::Real
        };
        let v = table.fresh_rename(Some(dom));
        // naming is definitional, so it carries no dependencies
        self.compose_r(v, p, Justification::empty(), out);
        v
    }

    /// Merge the arithmetic equality `a = b`.
    pub fn merge(
        &mut self,
        a: &Polynomial,
        b: &Polynomial,
        why: Justification,
        table: &mut VarTable,
        out: &mut Vec<Derived>,
    ) -> Result<()> {
        self.stats.merges += 1;
        let (ca, ja) = self.canon(a);
        let (cb, jb) = self.canon(b);
        let why = Justification::merged(Justification::merged(why, &ja), &jb);
        let d = ca.sub(&cb);

        let solution = if !d.terms().is_empty() && d.is_diophantine(table) {
            dioph::solve_zero(&d, table)
        } else {
            Polynomial::solve_zero(&d)
        };
        match solution {
            Solution::Valid => Ok(()),
            Solution::Inconsistent => Err(RatifyError::Inconsistent(why)),
            Solution::Solved(bindings) => {
                for (x, p) in bindings {
                    self.dispatch(x, p, why.clone(), table, out)?;
                }
                Ok(())
            }
        }
    }

    /// Route one solved form `x = p` into the state.
    fn dispatch(
        &mut self,
        x: Var,
        p: Polynomial,
        why: Justification,
        table: &mut VarTable,
        out: &mut Vec<Derived>,
    ) -> Result<()> {
        // the state may have moved underneath a queued solved form
        let (xc, jx) = self.canon(&Polynomial::var(x));
        let (pc, jp) = self.canon(&p);
        let why = Justification::merged(Justification::merged(why, &jx), &jp);
        if xc.as_var() != Some(x) {
            return self.merge(&xc, &pc, why, table, out);
        }

        if let Some(y) = pc.as_var() {
            // both sides are variables; the partition absorbs it
            out.push(Derived::VarEq(x, y, why));
            return Ok(());
        }
        if !x.is_slack() {
            self.compose_r(x, pc, why, out);
            return Ok(());
        }
        if let Some(y) = pc.greatest_nonslack() {
            // resolve: a slack on the left with a non-slack on the right is
            // re-isolated for the non-slack variable
            let e = pc.sub(&Polynomial::var(x));
            let q = e.isolate(y);
            return self.dispatch(y, q, why, table, out);
        }
        self.restricted_merge(x, &pc, why, table, out)
    }

    /// Both sides restricted: drive the equality through the tableau with a
    /// fresh zero slack.
    fn restricted_merge(
        &mut self,
        x: Var,
        p: &Polynomial,
        why: Justification,
        table: &mut VarTable,
        out: &mut Vec<Derived>,
    ) -> Result<()> {
        // orient the diff so its constant part is nonpositive
        let diff = p.sub(&Polynomial::var(x));
        let d = if diff.constant_part().is_positive() {
            diff.neg()
        } else {
            diff
        };
        let is_dioph = d.is_diophantine(table);
        let dom = if is_dioph {
            ratify_core::Dom::Int
        } else {
            ratify_core::Dom::Real
        };
        let k = table.fresh_zero_slack(Some(dom));
        tracing::trace!(?k, ?d, "restricted merge");

        self.add_to_t(k, d, why.clone(), out)?;
        self.infer(out)?;
        if is_dioph {
            self.gomory_cut(k, &why, out);
        }

        // enforce k = 0
        loop {
            let Some(binding) = self.t.get(k) else {
                self.compose_t(k, Polynomial::zero(), why, out);
                return Ok(());
            };
            let rhs = binding.rhs.clone();
            let row_why = binding.why.clone();
            let c = rhs.constant_part().clone();

            if c.is_negative() {
                return Err(RatifyError::Inconsistent(Justification::merged(why, &row_why)));
            }
            if c.is_zero() {
                if let Some(m) = rhs.terms().first() {
                    // k = rhs and k = 0, so rhs = 0: isolate one variable
                    let q = rhs.isolate(m.var);
                    let w = Justification::merged(why.clone(), &row_why);
                    self.compose_t(m.var, q, w, out);
                }
                if self.t.rhs(k) != Some(&Polynomial::zero()) {
                    self.compose_t(k, Polynomial::zero(), why, out);
                }
                return Ok(());
            }
            // c > 0: k is bounded below by a positive constant
            if !rhs.has_neg() {
                return Err(RatifyError::Inconsistent(Justification::merged(why, &row_why)));
            }
            // a negative variable whose overall gain matches its gain in
            // this row can be pivoted to drive the constant to zero
            let mut chosen = None;
            for m in rhs.neg_terms() {
                let gain_here = &c / &(-&m.coeff);
                if let Some((gain_t, _)) = self.min_gain(m.var) {
                    if gain_t >= gain_here {
                        chosen = Some(m.var);
                        break;
                    }
                }
            }
            let y = chosen.unwrap_or_else(|| {
                rhs.least_neg().expect("has a negative monomial").var
            });
            self.pivot(y, out)?;
        }
    }

    /// Install `k = a` into the tableau, restoring feasibility first.
    fn add_to_t(
        &mut self,
        k: Var,
        a: Polynomial,
        why: Justification,
        out: &mut Vec<Derived>,
    ) -> Result<()> {
        debug_assert!(k.is_slack() && a.is_restricted());
        let mut a = a;
        let mut why = why;
        loop {
            if !a.constant_part().is_negative() {
                self.compose_t(k, a, why, out);
                return Ok(());
            }
            if !a.has_pos() {
                return Err(RatifyError::Inconsistent(why));
            }
            // an unbounded positive variable can absorb the equation
            let unbounded = a
                .pos_terms()
                .find(|m| self.t.negdep_is_empty(m.var))
                .map(|m| m.var);
            if let Some(y) = unbounded {
                let e = a.sub(&Polynomial::var(k));
                let mut q = e.isolate(y);
                if k.is_zero_slack() {
                    q = q.subst(k, &Polynomial::zero());
                }
                self.compose_t(y, q, why, out);
                return Ok(());
            }
            // every positive variable is bounded: pivot the least one and
            // renormalise the right-hand side
            let y = a.least_pos().expect("has a positive monomial").var;
            self.pivot(y, out)?;
            let (a2, j2) = self.canon(&a);
            a = a2;
            why.union(&j2);
        }
    }

    /// Minimum gain of `y` over the rows that mention it negatively,
    /// tie-broken by the variable order on the row's left-hand side.
    fn min_gain(&self, y: Var) -> Option<(BigRational, Var)> {
        let mut best: Option<(BigRational, Var)> = None;
        for k in self.t.negdep_sorted(y) {
            let rhs = self.t.rhs(k).expect("negdep row is bound");
            let coeff = rhs.coeff(y).expect("negdep row mentions y");
            debug_assert!(coeff.is_negative());
            let gain = rhs.constant_part() / -coeff;
            // strict improvement keeps the least row on ties
            let better = match &best {
                Some((g, _)) => gain < *g,
                None => true,
            };
            if better {
                best = Some((gain, k));
            }
        }
        best
    }

    /// Pivot on `y`: isolate it in its minimum-gain row and compose the
    /// result. Errors with [`RatifyError::Unbounded`] when no row bounds `y`.
    fn pivot(&mut self, y: Var, out: &mut Vec<Derived>) -> Result<()> {
        let (gain, row) = self.min_gain(y).ok_or(RatifyError::Unbounded)?;
        tracing::trace!(?y, ?row, %gain, "pivot");
        let binding = self.t.remove(row).expect("pivot row is bound");
        let e = binding.rhs.sub(&Polynomial::var(row));
        let q = e.isolate(y);
        self.compose_t(y, q, binding.why, out);
        self.stats.pivots += 1;
        Ok(())
    }

    /// Two-phase zero analysis: find variables that cannot move off zero
    /// and broadcast the entailed equalities with the zero slack.
    fn infer(&mut self, out: &mut Vec<Derived>) -> Result<()> {
        use rustc_hash::FxHashSet;

        // phase 1: variables occurring negatively in a zero row
        let mut z: FxHashSet<Var> = FxHashSet::default();
        for k in self.t.zeros_sorted() {
            if let Some(rhs) = self.t.rhs(k) {
                for m in rhs.neg_terms() {
                    z.insert(m.var);
                }
            }
        }
        // phase 2: drop any candidate with an escape route - a row
        // mentioning it negatively whose positive part can still move
        loop {
            let mut sorted: Vec<Var> = z.iter().copied().collect();
            sorted.sort_unstable();
            let mut removed = None;
            'scan: for y in sorted {
                for k in self.t.negdep_sorted(y) {
                    let rhs = self.t.rhs(k).expect("negdep row is bound");
                    if rhs.pos_terms().any(|m| !z.contains(&m.var)) {
                        removed = Some(y);
                        break 'scan;
                    }
                }
            }
            match removed {
                Some(y) => {
                    z.remove(&y);
                }
                None => break,
            }
        }
        // phase 3: dependent rows whose positive variables all sit in Z;
        // maximise the zero rows among them
        for k in self.t.zeros_sorted() {
            let all_in = self
                .t
                .rhs(k)
                .map_or(false, |rhs| rhs.pos_terms().all(|m| z.contains(&m.var)));
            if all_in {
                self.maximize_row(k, &z, out)?;
            }
        }
        Ok(())
    }

    /// Pivot the positive part of a zero row away; when none is left, every
    /// negatively-occurring variable is entailed zero.
    fn maximize_row(
        &mut self,
        k: Var,
        z: &rustc_hash::FxHashSet<Var>,
        out: &mut Vec<Derived>,
    ) -> Result<()> {
        loop {
            let Some(binding) = self.t.get(k) else {
                return Ok(());
            };
            let rhs = binding.rhs.clone();
            let why = binding.why.clone();
            if !rhs.constant_part().is_zero() {
                return Ok(());
            }
            if !rhs.has_pos() {
                for m in rhs.neg_terms() {
                    tracing::debug!(var = ?m.var, "inferred zero");
                    out.push(Derived::VarEq(m.var, self.zero_var, why.clone()));
                    self.stats.inferred_zeros += 1;
                }
                return Ok(());
            }
            if rhs
                .pos_terms()
                .any(|m| self.t.negdep_is_empty(m.var) || !z.contains(&m.var))
            {
                return Ok(());
            }
            let y = rhs.least_pos().expect("has a positive monomial").var;
            self.pivot(y, out)?;
        }
    }

    /// Emit the Gomory cut of the current binding of `k`:
    /// `−def(c₀) + Σ frac(cᵢ)·xᵢ ≥ 0`. Integral constants yield no cut.
    fn gomory_cut(&mut self, k: Var, why: &Justification, out: &mut Vec<Derived>) {
        let Some(binding) = self.t.get(k) else { return };
        let deficit = binding.rhs.constant_part().deficit();
        if deficit.is_zero() {
            return;
        }
        let terms: Vec<Monomial> = binding
            .rhs
            .terms()
            .iter()
            .filter_map(|m| {
                let f = m.coeff.frac();
                (!f.is_zero()).then_some(Monomial { var: m.var, coeff: f })
            })
            .collect();
        let cut = Polynomial::from_parts(-deficit, terms);
        tracing::debug!(?cut, "gomory cut");
        out.push(Derived::Cut(cut, Justification::merged(why.clone(), &binding.why)));
        self.stats.gomory_cuts += 1;
    }

    /// Process `a ≥ 0`.
    pub fn process_nonneg(
        &mut self,
        a: &Polynomial,
        why: Justification,
        table: &mut VarTable,
        out: &mut Vec<Derived>,
    ) -> Result<()> {
        self.stats.nonnegs += 1;
        let (a, ja) = self.canon(a);
        let why = Justification::merged(why, &ja);

        if let Some(c) = a.as_constant() {
            return if c.is_negative() {
                Err(RatifyError::Inconsistent(why))
            } else {
                Ok(())
            };
        }
        if a.is_restricted() {
            // cheap tests: entailed or refuted by signs alone
            if !a.constant_part().is_negative() && !a.has_neg() {
                return Ok(());
            }
            if a.constant_part().is_negative() && !a.has_pos() {
                return Err(RatifyError::Inconsistent(why));
            }
        }

        let is_dioph = a.is_diophantine(table);
        let dom = if is_dioph {
            ratify_core::Dom::Int
        } else {
            ratify_core::Dom::Real
        };
        let k = table.fresh_slack(Some(dom));

        if let Some(y) = a.greatest_nonslack() {
            // eliminate the inequality as an equality on a non-slack
            let e = a.sub(&Polynomial::var(k));
            let q = e.isolate(y);
            return self.dispatch(y, q, why, table, out);
        }
        if a.constant_part().is_negative() {
            // absorb into an unbounded positive variable when possible
            let unbounded = a
                .pos_terms()
                .find(|m| self.t.negdep_is_empty(m.var))
                .map(|m| m.var);
            if let Some(y) = unbounded {
                let e = a.sub(&Polynomial::var(k));
                let q = e.isolate(y);
                self.compose_t(y, q, why, out);
                return Ok(());
            }
        }
        self.add_to_t(k, a, why.clone(), out)?;
        self.infer(out)?;
        if is_dioph {
            self.gomory_cut(k, &why, out);
        }
        Ok(())
    }

    /// Maximise `a` over the current configuration.
    ///
    /// Pivots mutate the tableau into an equivalent dictionary; any derived
    /// equalities surface through `out`.
    pub fn sup(&mut self, a: &Polynomial, out: &mut Vec<Derived>) -> Result<Extremum> {
        let (mut a, _) = self.canon(a);
        loop {
            if a.greatest_nonslack().is_some() {
                // the unrestricted part is free to grow without bound
                return Ok(Extremum::Unbounded);
            }
            let Some(m) = a.least_pos() else {
                return Ok(Extremum::Finite(a.constant_part().clone()));
            };
            let y = m.var;
            if self.t.negdep_is_empty(y) {
                return Ok(Extremum::Unbounded);
            }
            self.pivot(y, out)?;
            a = self.canon(&a).0;
        }
    }

    /// Feasibility of the tableau: every constant part is nonnegative.
    pub fn is_feasible(&self) -> bool {
        self.t
            .lhs_sorted()
            .into_iter()
            .all(|k| !self.t.rhs(k).expect("bound").constant_part().is_negative())
    }

    /// Structural audit of both sets and the cross-set solved form.
    pub fn audit(&self) -> bool {
        if !self.r.audit() || !self.t.audit() || !self.is_feasible() {
            return false;
        }
        // the tableau binds slacks to restricted right-hand sides only
        for x in self.r.lhs_sorted() {
            if x.is_slack() || !self.t.dependents_sorted(x).is_empty() {
                return false;
            }
        }
        for k in self.t.lhs_sorted() {
            if !k.is_slack() {
                return false;
            }
            if !self.t.rhs(k).expect("bound").is_restricted() {
                return false;
            }
            // joint solved form: no tableau lhs inside R right-hand sides
            if !self.r.dependents_sorted(k).is_empty() {
                return false;
            }
        }
        true
    }
}
