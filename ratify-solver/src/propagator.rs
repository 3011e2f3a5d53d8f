//! The propagation engine: fact queue, cross-component dispatch and
//! speculative case analysis.
//!
//! The engine owns the variable table, the partition, the disequality set
//! and the simplex. Facts drain one at a time; anything a component derives
//! (variable equalities from the zero analysis or from binding collisions,
//! Gomory cuts) is re-enqueued until the queue empties or a contradiction
//! unwinds. Speculative branches run against a snapshot with propagation to
//! the outer queue disabled, and the snapshot is restored on every exit
//! path.

use std::collections::VecDeque;

use num_rational::BigRational;
use num_traits::{One, Zero};
use ratify_core::{Answer, Dom, Justification, RatifyError, Result, Var, VarTable};
use ratify_math::polynomial::{Monomial, Polynomial};
use ratify_math::rational::denom_lcm;

use crate::diseq::DiseqSet;
use crate::partition::Partition;
use crate::simplex::{Derived, Extremum, Simplex};

/// A fact awaiting propagation.
#[derive(Debug, Clone)]
pub enum Fact {
    /// Arithmetic equality `a = b`.
    Equal(Polynomial, Polynomial, Justification),
    /// Variable equality, routed to the partition.
    VarEq(Var, Var, Justification),
    /// Disequality `a ≠ b`.
    Diseq(Polynomial, Polynomial, Justification),
    /// Nonnegativity `a ≥ 0`.
    Nonneg(Polynomial, Justification),
}

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on the contiguous excluded-segment search around a Diophantine
    /// disequality, in each direction.
    pub max_segment: u32,
    /// Make `valid` complete on atoms by refuting the negation speculatively.
    pub complete_tests: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_segment: 16,
            complete_tests: false,
        }
    }
}

/// Counters for the propagation layer.
#[derive(Debug, Clone, Default)]
pub struct PropagatorStats {
    /// Facts drained from the queue.
    pub facts: u64,
    /// Variable merges applied to the partition.
    pub var_merges: u64,
    /// Disequalities recorded.
    pub recorded_diseqs: u64,
    /// Speculative probes run.
    pub probes: u64,
    /// Bounds committed by the disequality segment analysis.
    pub committed_bounds: u64,
}

/// A logical snapshot of the propagation state.
///
/// The variable table is excluded: names and counters are monotonic, so a
/// rollback never invalidates a handle a caller has already seen.
#[derive(Clone)]
pub struct Snapshot {
    partition: Partition,
    diseqs: DiseqSet,
    simplex: Simplex,
    queue: VecDeque<Fact>,
}

/// The propagation engine.
pub struct Engine {
    vars: VarTable,
    partition: Partition,
    diseqs: DiseqSet,
    simplex: Simplex,
    queue: VecDeque<Fact>,
    speculative: bool,
    config: EngineConfig,
    stats: PropagatorStats,
}

impl Engine {
    /// Create an engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let vars = VarTable::new();
        let simplex = Simplex::new(vars.zero_var());
        Engine {
            vars,
            partition: Partition::new(),
            diseqs: DiseqSet::new(),
            simplex,
            queue: VecDeque::new(),
            speculative: false,
            config,
            stats: PropagatorStats::default(),
        }
    }

    /// The variable table.
    pub fn vars(&self) -> &VarTable {
        &self.vars
    }

    /// Mutable access to the variable table (declaring user variables).
    pub fn vars_mut(&mut self) -> &mut VarTable {
        &mut self.vars
    }

    /// The simplex state.
    pub fn simplex(&self) -> &Simplex {
        &self.simplex
    }

    /// Counters.
    pub fn stats(&self) -> &PropagatorStats {
        &self.stats
    }

    /// Enqueue a fact.
    pub fn push(&mut self, fact: Fact) {
        self.queue.push_back(fact);
    }

    /// Drain the queue to a fixed point or a contradiction.
    pub fn drain(&mut self) -> Result<()> {
        while let Some(fact) = self.queue.pop_front() {
            self.stats.facts += 1;
            self.dispatch(fact)?;
        }
        Ok(())
    }

    fn queue_derived(&mut self, derived: Vec<Derived>) {
        for d in derived {
            match d {
                Derived::VarEq(a, b, why) => self.queue.push_back(Fact::VarEq(a, b, why)),
                Derived::Cut(p, why) => self.queue.push_back(Fact::Nonneg(p, why)),
            }
        }
    }

    fn dispatch(&mut self, fact: Fact) -> Result<()> {
        match fact {
            Fact::Equal(a, b, why) => {
                let (ca, ja) = self.canonize(&a);
                let (cb, jb) = self.canonize(&b);
                let why = Justification::merged(Justification::merged(why, &ja), &jb);
                if let (Some(x), Some(y)) = (ca.as_var(), cb.as_var()) {
                    return self.merge_vars(x, y, why);
                }
                let mut out = Vec::new();
                let res = self.simplex.merge(&ca, &cb, why, &mut self.vars, &mut out);
                self.queue_derived(out);
                res
            }
            Fact::VarEq(x, y, why) => self.merge_vars(x, y, why),
            Fact::Nonneg(a, why) => {
                let (ca, ja) = self.canonize(&a);
                let why = Justification::merged(why, &ja);
                let mut out = Vec::new();
                let res = self
                    .simplex
                    .process_nonneg(&ca, why, &mut self.vars, &mut out);
                self.queue_derived(out);
                res
            }
            Fact::Diseq(a, b, why) => self.process_diseq(&a, &b, why),
        }
    }

    /// Canonicalise through the partition, then through `R ∪ T`.
    pub fn canonize(&mut self, p: &Polynomial) -> (Polynomial, Justification) {
        let mut q = p.clone();
        let mut why = Justification::empty();
        let vs: Vec<Var> = p.vars().collect();
        for v in vs {
            let (rv, jv) = self.partition.canon(v);
            if rv != v {
                let rep = self.rep_poly(rv);
                q = q.subst(v, &rep);
                why.union(&jv);
            }
        }
        let (q, j) = self.simplex.canon(&q);
        why.union(&j);
        (q, why)
    }

    /// The polynomial a representative stands for: the zero slack denotes
    /// the constant 0, anything else itself.
    fn rep_poly(&self, rep: Var) -> Polynomial {
        if rep == self.vars.zero_var() {
            Polynomial::zero()
        } else {
            Polynomial::var(rep)
        }
    }

    /// Merge two variables in the partition and reconcile their bindings.
    pub fn merge_vars(&mut self, x: Var, y: Var, why: Justification) -> Result<()> {
        let (rx, jx) = self.partition.canon(x);
        let (ry, jy) = self.partition.canon(y);
        let why = Justification::merged(Justification::merged(why, &jx), &jy);
        if rx == ry {
            return Ok(());
        }
        if let Some(jd) = self.diseqs.check(rx, ry) {
            return Err(RatifyError::Inconsistent(Justification::merged(why, jd)));
        }
        self.stats.var_merges += 1;
        let (winner, loser) = if rx < ry { (rx, ry) } else { (ry, rx) };
        tracing::debug!(?winner, ?loser, "merge");
        self.partition.union(loser, winner, why.clone());

        // the class domain is the intersection of both domains
        if let Some(dl) = self.vars.dom(loser) {
            let met = match self.vars.dom(winner) {
                Some(dw) => Dom::meet(dl, dw),
                None => dl,
            };
            self.vars.set_dom(winner, met);
        }
        self.diseqs.remap(loser, winner);

        // reconcile solution-set bindings and fuse the loser away
        let lost = self.simplex.remove_binding(loser);
        let kept = self.simplex.binding_of(winner).cloned();
        let rep = self.rep_poly(winner);
        let mut out = Vec::new();
        self.simplex.fuse_var(loser, &rep, &why, &mut out);
        self.queue_derived(out);
        match (lost, kept) {
            (None, _) => {}
            (Some(bl), None) => {
                let fact = if winner == self.vars.zero_var() {
                    Fact::Equal(bl.rhs, Polynomial::zero(), Justification::merged(bl.why, &why))
                } else {
                    Fact::Equal(
                        Polynomial::var(winner),
                        bl.rhs,
                        Justification::merged(bl.why, &why),
                    )
                };
                self.queue.push_back(fact);
            }
            (Some(bl), Some(bw)) => {
                let merged = Justification::merged(Justification::merged(bl.why, &bw.why), &why);
                self.queue.push_back(Fact::Equal(bl.rhs, bw.rhs, merged));
            }
        }
        Ok(())
    }

    /// Record `x ≠ y` between canonicalised variables.
    pub fn dismerge(&mut self, x: Var, y: Var, why: Justification) -> Result<()> {
        let (rx, jx) = self.partition.canon(x);
        let (ry, jy) = self.partition.canon(y);
        let why = Justification::merged(Justification::merged(why, &jx), &jy);
        if rx == ry {
            return Err(RatifyError::Inconsistent(why));
        }
        self.diseqs.add(rx, ry, why);
        self.stats.recorded_diseqs += 1;
        Ok(())
    }

    fn process_diseq(&mut self, a: &Polynomial, b: &Polynomial, why: Justification) -> Result<()> {
        let (ca, ja) = self.canonize(a);
        let (cb, jb) = self.canonize(b);
        let why = Justification::merged(Justification::merged(why, &ja), &jb);
        let d = ca.sub(&cb);
        if let Some(c) = d.as_constant() {
            return if c.is_zero() {
                Err(RatifyError::Inconsistent(why))
            } else {
                Ok(())
            };
        }
        if d.is_diophantine(&self.vars) {
            self.dioph_diseq(&d, why)
        } else {
            self.record_diseq(&ca, &cb, why)
        }
    }

    fn record_diseq(&mut self, s: &Polynomial, t: &Polynomial, why: Justification) -> Result<()> {
        let mut out = Vec::new();
        let vs = self.simplex.name(s, &mut self.vars, &mut out);
        let vt = self.simplex.name(t, &mut self.vars, &mut out);
        self.queue_derived(out);
        self.dismerge(vs, vt, why)
    }

    /// Diophantine disequality: normalise `d ≠ 0` to `e ≠ n` over coprime
    /// integer coefficients, grow the maximal contiguous excluded segment
    /// `[lo..hi]` from recorded disequalities, then case-split the two
    /// complementary bounds speculatively.
    fn dioph_diseq(&mut self, d: &Polynomial, why: Justification) -> Result<()> {
        let lcm = denom_lcm(d.terms().iter().map(|m| &m.coeff));
        let scale = BigRational::from_integer(lcm);
        let e = Polynomial::from_parts(
            BigRational::zero(),
            d.terms()
                .iter()
                .map(|m| Monomial {
                    var: m.var,
                    coeff: &m.coeff * &scale,
                })
                .collect(),
        );
        let mut n = -(d.constant_part() * &scale);
        // e takes integer values only; a fractional excluded value is
        // trivially never attained
        if !n.is_integer() {
            return Ok(());
        }
        let mut g = num_bigint::BigInt::zero();
        for m in e.terms() {
            g = num_integer::Integer::gcd(&g, &m.coeff.to_integer());
        }
        let g = BigRational::from_integer(g);
        let e = e.scale(&(BigRational::one() / &g));
        n = &n / &g;
        if !n.is_integer() {
            return Ok(());
        }

        let mut out = Vec::new();
        let ve = self.simplex.name(&e, &mut self.vars, &mut out);
        let vn = self.simplex.name(&Polynomial::constant(n.clone()), &mut self.vars, &mut out);
        self.queue_derived(out);
        self.dismerge(ve, vn, why.clone())?;

        // speculative branches must not recurse into further splits
        if self.speculative {
            return Ok(());
        }

        let (rve, jve) = self.partition.canon(ve);
        let mut seg_why = Justification::merged(why, &jve);
        let one = BigRational::one();
        let mut hi = n.clone();
        for _ in 0..self.config.max_segment {
            let next = &hi + &one;
            match self.excluded(rve, &next) {
                Some(j) => {
                    hi = next;
                    seg_why.union(&j);
                }
                None => break,
            }
        }
        let mut lo = n;
        for _ in 0..self.config.max_segment {
            let next = &lo - &one;
            match self.excluded(rve, &next) {
                Some(j) => {
                    lo = next;
                    seg_why.union(&j);
                }
                None => break,
            }
        }

        let low_branch = Polynomial::constant(&lo - &one).sub(&e);
        let high_branch = e.sub(&Polynomial::constant(&hi + &one));
        let res_low = self.probe(vec![Fact::Nonneg(low_branch.clone(), seg_why.clone())])?;
        let res_high = self.probe(vec![Fact::Nonneg(high_branch.clone(), seg_why.clone())])?;
        match (res_low, res_high) {
            (Some(jl), Some(jh)) => {
                Err(RatifyError::Inconsistent(Justification::merged(jl, &jh)))
            }
            (Some(jl), None) => {
                // only values above the segment remain
                self.stats.committed_bounds += 1;
                self.queue
                    .push_back(Fact::Nonneg(high_branch, Justification::merged(seg_why, &jl)));
                Ok(())
            }
            (None, Some(jh)) => {
                self.stats.committed_bounds += 1;
                self.queue
                    .push_back(Fact::Nonneg(low_branch, Justification::merged(seg_why, &jh)));
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }

    /// Whether `e ≠ value` is already recorded: a variable currently bound
    /// to the constant and disequal to `e`'s representative.
    fn excluded(&mut self, rve: Var, value: &BigRational) -> Option<Justification> {
        let v = self.simplex.constant_var(value)?;
        let (rv, jv) = self.partition.canon(v);
        let jd = self.diseqs.check(rve, rv)?.clone();
        Some(Justification::merged(jd, &jv))
    }

    /// Run facts against a snapshot; `Ok(Some(core))` reports the
    /// refutation of the branch, `Ok(None)` a consistent outcome. The
    /// snapshot (including the outer queue) is restored on every path.
    pub fn probe(&mut self, facts: Vec<Fact>) -> Result<Option<Justification>> {
        self.stats.probes += 1;
        let snapshot = self.snapshot();
        let was_speculative = self.speculative;
        self.speculative = true;
        self.queue = VecDeque::from(facts);
        let outcome = self.drain();
        self.restore(snapshot);
        self.speculative = was_speculative;
        match outcome {
            Ok(()) => Ok(None),
            Err(RatifyError::Inconsistent(core)) => Ok(Some(core)),
            Err(other) => Err(other),
        }
    }

    /// Take a logical snapshot of the propagation state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            partition: self.partition.clone(),
            diseqs: self.diseqs.clone(),
            simplex: self.simplex.clone(),
            queue: self.queue.clone(),
        }
    }

    /// Restore a snapshot taken earlier.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.partition = snapshot.partition;
        self.diseqs = snapshot.diseqs;
        self.simplex = snapshot.simplex;
        self.queue = snapshot.queue;
    }

    /// Maximise a term over the current configuration.
    pub fn sup(&mut self, p: &Polynomial) -> Result<Extremum> {
        let (cp, _) = self.canonize(p);
        let mut out = Vec::new();
        let result = self.simplex.sup(&cp, &mut out)?;
        self.queue_derived(out);
        self.drain()?;
        Ok(result)
    }

    /// Minimise a term: `inf(a) = −sup(−a)`.
    pub fn inf(&mut self, p: &Polynomial) -> Result<Extremum> {
        match self.sup(&p.neg())? {
            Extremum::Finite(q) => Ok(Extremum::Finite(-q)),
            Extremum::Unbounded => Ok(Extremum::Unbounded),
        }
    }

    /// The right-hand side assigned to a variable in `R ∪ T`.
    pub fn find(&mut self, x: Var) -> Result<Polynomial> {
        let (rx, _) = self.partition.canon(x);
        if rx == self.vars.zero_var() {
            return Ok(Polynomial::zero());
        }
        self.simplex
            .binding_of(rx)
            .map(|b| b.rhs.clone())
            .ok_or(RatifyError::NotFound)
    }

    /// The left-hand side of the binding whose right-hand side equals `p`.
    pub fn inv(&mut self, p: &Polynomial) -> Result<Var> {
        let (cp, _) = self.canonize(p);
        self.simplex.inv_var(&cp).ok_or(RatifyError::NotFound)
    }

    /// Intern a term under a (possibly fresh) variable.
    pub fn name(&mut self, p: &Polynomial) -> Var {
        let (cp, _) = self.canonize(p);
        let mut out = Vec::new();
        let v = self.simplex.name(&cp, &mut self.vars, &mut out);
        self.queue_derived(out);
        v
    }

    /// Three-valued variable equality test.
    pub fn is_equal(&mut self, x: Var, y: Var) -> Answer {
        let (rx, jx) = self.partition.canon(x);
        let (ry, jy) = self.partition.canon(y);
        if rx == ry {
            return Answer::Yes(Justification::merged(jx, &jy));
        }
        if let Some(jd) = self.diseqs.check(rx, ry) {
            let why = Justification::merged(Justification::merged(jx, &jy), jd);
            return Answer::No(why);
        }
        Answer::Unknown
    }

    /// Three-valued variable disequality test.
    pub fn is_diseq(&mut self, x: Var, y: Var) -> Answer {
        match self.is_equal(x, y) {
            Answer::Yes(j) => Answer::No(j),
            Answer::No(j) => Answer::Yes(j),
            Answer::Unknown => Answer::Unknown,
        }
    }

    /// Whether `valid` may use speculative refutation.
    pub fn complete_tests(&self) -> bool {
        self.config.complete_tests
    }

    /// Structural audit across all components.
    pub fn audit(&self) -> bool {
        self.simplex.audit()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratify_core::AtomId;
    use ratify_math::rational::rat;

    fn j(n: u32) -> Justification {
        Justification::single(AtomId(n))
    }

    fn ge(p: Polynomial, c: i64, why: Justification) -> Fact {
        Fact::Nonneg(p.sub(&Polynomial::constant(rat(c))), why)
    }

    #[test]
    fn test_bounds_conflict_core() {
        let mut engine = Engine::default();
        let x = engine.vars_mut().external("x", None);
        engine.push(ge(Polynomial::var(x), 5, j(0)));
        engine.push(Fact::Nonneg(
            Polynomial::constant(rat(2)).sub(&Polynomial::var(x)),
            j(1),
        ));
        let err = engine.drain().unwrap_err();
        let core = err.core().expect("inconsistency carries a core").clone();
        assert!(core.contains(AtomId(0)) && core.contains(AtomId(1)));
        assert_eq!(core.len(), 2);
    }

    #[test]
    fn test_diseq_then_equal_conflicts() {
        let mut engine = Engine::default();
        let x = engine.vars_mut().external("x", Some(Dom::Int));
        engine.push(Fact::Diseq(
            Polynomial::var(x),
            Polynomial::constant(rat(3)),
            j(0),
        ));
        engine.drain().unwrap();
        assert!(engine.audit());

        engine.push(Fact::Equal(
            Polynomial::var(x),
            Polynomial::constant(rat(3)),
            j(1),
        ));
        let err = engine.drain().unwrap_err();
        let core = err.core().unwrap();
        assert!(core.contains(AtomId(0)) && core.contains(AtomId(1)));
    }

    #[test]
    fn test_probe_restores_state() {
        let mut engine = Engine::default();
        let x = engine.vars_mut().external("x", None);
        engine.push(ge(Polynomial::var(x), 1, j(0)));
        engine.drain().unwrap();

        let before = engine.simplex().regular().len();
        // probing an inconsistent bound must not leak state
        let refuted = engine
            .probe(vec![Fact::Nonneg(
                Polynomial::constant(rat(0)).sub(&Polynomial::var(x)),
                j(1),
            )])
            .unwrap();
        assert!(refuted.is_some());
        assert_eq!(engine.simplex().regular().len(), before);
        assert!(engine.audit());
    }

    #[test]
    fn test_entailed_zero_propagates_to_partition() {
        let mut engine = Engine::default();
        let x = engine.vars_mut().external("x", None);
        let y = engine.vars_mut().external("y", None);
        engine.push(ge(Polynomial::var(x), 0, j(0)));
        engine.push(ge(Polynomial::var(y), 0, j(1)));
        // x + y ≤ 0 forces both to zero
        engine.push(Fact::Nonneg(
            Polynomial::var(x).add(&Polynomial::var(y)).neg(),
            j(2),
        ));
        engine.drain().unwrap();

        let fx = engine.find(x).unwrap();
        let fy = engine.find(y).unwrap();
        assert_eq!(fx.as_constant(), Some(&rat(0)));
        assert_eq!(fy.as_constant(), Some(&rat(0)));
        assert!(engine.audit());
    }

    #[test]
    fn test_var_merge_respects_diseq() {
        let mut engine = Engine::default();
        let x = engine.vars_mut().external("x", None);
        let y = engine.vars_mut().external("y", None);
        engine.dismerge(x, y, j(0)).unwrap();
        let err = engine.merge_vars(x, y, j(1)).unwrap_err();
        let core = err.core().unwrap();
        assert!(core.contains(AtomId(0)) && core.contains(AtomId(1)));
    }
}
