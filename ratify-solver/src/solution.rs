//! Solution sets: functional, inverse-functional maps `lhs ↦ rhs`.
//!
//! Both simplex solution sets (`R` over non-slack left-hand sides, the
//! tableau `T` over slacks) are instances. The set keeps itself in solved
//! form: no left-hand side ever occurs in a right-hand side. Derived
//! indices are maintained incrementally:
//! - dependence: `y ↦ {lhs | y ∈ vars(rhs(lhs))}`
//! - neg-dependence: `y ↦ {lhs | y ∈ rhs(lhs)⁻}`
//! - constants: left-hand sides bound to a rational constant
//! - zeros: left-hand sides whose right-hand side has constant part 0
//!
//! A right-hand side that collapses to a bare variable, or that collides
//! with an existing right-hand side, is not stored; it is surfaced as a
//! derived variable equality for the partition to absorb. This collision
//! rule is what turns inverse-functionality into an equality-inference
//! mechanism.

use num_traits::{Signed, Zero};
use ratify_core::{Justification, Var};
use ratify_math::Polynomial;
use rustc_hash::{FxHashMap, FxHashSet};

/// A right-hand side with the dependency set of the equality it records.
#[derive(Clone, Debug)]
pub struct Binding {
    /// The bound polynomial.
    pub rhs: Polynomial,
    /// Why `lhs = rhs` holds.
    pub why: Justification,
}

/// Side effects of a binding update.
#[derive(Debug)]
pub enum Event {
    /// A right-hand side collapsed to a bare variable or collided with an
    /// existing binding: the two variables are equal.
    VarEq {
        /// One side of the derived equality.
        a: Var,
        /// The other side.
        b: Var,
        /// Combined dependency set.
        why: Justification,
    },
    /// `lhs` is now bound to a rational constant.
    Constant {
        /// The newly-constant left-hand side.
        lhs: Var,
    },
}

/// A functional, inverse-functional solution set.
#[derive(Clone, Default)]
pub struct SolutionSet {
    find: FxHashMap<Var, Binding>,
    inv: FxHashMap<Polynomial, Var>,
    dep: FxHashMap<Var, FxHashSet<Var>>,
    negdep: FxHashMap<Var, FxHashSet<Var>>,
    constants: FxHashSet<Var>,
    zeros: FxHashSet<Var>,
}

impl SolutionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        SolutionSet::default()
    }

    /// The binding of `x`, if present.
    pub fn get(&self, x: Var) -> Option<&Binding> {
        self.find.get(&x)
    }

    /// The right-hand side of `x`, if present.
    pub fn rhs(&self, x: Var) -> Option<&Polynomial> {
        self.find.get(&x).map(|b| &b.rhs)
    }

    /// Whether `x` is a left-hand side.
    pub fn contains(&self, x: Var) -> bool {
        self.find.contains_key(&x)
    }

    /// The left-hand side bound to exactly this right-hand side, if any.
    pub fn inv_lookup(&self, p: &Polynomial) -> Option<Var> {
        self.inv.get(p).copied()
    }

    /// All left-hand sides, ascending.
    pub fn lhs_sorted(&self) -> Vec<Var> {
        let mut out: Vec<Var> = self.find.keys().copied().collect();
        out.sort_unstable();
        out
    }

    /// Left-hand sides whose right-hand side has constant part 0, ascending.
    pub fn zeros_sorted(&self) -> Vec<Var> {
        let mut out: Vec<Var> = self.zeros.iter().copied().collect();
        out.sort_unstable();
        out
    }

    /// Left-hand sides bound to a rational constant, ascending.
    pub fn constants_sorted(&self) -> Vec<Var> {
        let mut out: Vec<Var> = self.constants.iter().copied().collect();
        out.sort_unstable();
        out
    }

    /// Left-hand sides whose right-hand side mentions `y` negatively,
    /// ascending.
    pub fn negdep_sorted(&self, y: Var) -> Vec<Var> {
        let mut out: Vec<Var> = self
            .negdep
            .get(&y)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    /// Whether `y` has no negative occurrence in the set (it is *unbounded*).
    pub fn negdep_is_empty(&self, y: Var) -> bool {
        self.negdep.get(&y).map_or(true, |s| s.is_empty())
    }

    /// Left-hand sides whose right-hand side mentions `y`, ascending.
    pub fn dependents_sorted(&self, y: Var) -> Vec<Var> {
        let mut out: Vec<Var> = self
            .dep
            .get(&y)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.find.len()
    }

    /// Whether the set has no bindings.
    pub fn is_empty(&self) -> bool {
        self.find.is_empty()
    }

    /// Canonicalise `p` through the set: one simultaneous substitution of
    /// every bound variable. Returns the result together with the union of
    /// the justifications of the bindings used.
    pub fn norm(&self, p: &Polynomial) -> (Polynomial, Justification) {
        let bound: Vec<Var> = p.vars().filter(|v| self.find.contains_key(v)).collect();
        if bound.is_empty() {
            return (p.clone(), Justification::empty());
        }
        let mut out = p.clone();
        let mut why = Justification::empty();
        for v in bound {
            let b = &self.find[&v];
            out = out.subst(v, &b.rhs);
            why.union(&b.why);
        }
        (out, why)
    }

    fn insert_raw(&mut self, x: Var, rhs: Polynomial, why: Justification) {
        for m in rhs.terms() {
            self.dep.entry(m.var).or_default().insert(x);
            if m.coeff.is_negative() {
                self.negdep.entry(m.var).or_default().insert(x);
            }
        }
        if rhs.as_constant().is_some() {
            self.constants.insert(x);
        }
        if rhs.constant_part().is_zero() {
            self.zeros.insert(x);
        }
        self.inv.insert(rhs.clone(), x);
        self.find.insert(x, Binding { rhs, why });
    }

    /// Remove and return the binding of `x`, updating every index.
    pub fn remove(&mut self, x: Var) -> Option<Binding> {
        let binding = self.find.remove(&x)?;
        for m in binding.rhs.terms() {
            if let Some(set) = self.dep.get_mut(&m.var) {
                set.remove(&x);
            }
            if let Some(set) = self.negdep.get_mut(&m.var) {
                set.remove(&x);
            }
        }
        self.constants.remove(&x);
        self.zeros.remove(&x);
        self.inv.remove(&binding.rhs);
        Some(binding)
    }

    /// Bind `x ↦ rhs` unless the right-hand side is a bare variable or
    /// collides with an existing one; those surface as [`Event::VarEq`].
    fn bind_checked(&mut self, x: Var, rhs: Polynomial, why: Justification, events: &mut Vec<Event>) {
        if let Some(y) = rhs.as_var() {
            events.push(Event::VarEq { a: x, b: y, why });
            return;
        }
        if let Some(other) = self.inv_lookup(&rhs) {
            debug_assert_ne!(other, x);
            let owhy = self.find[&other].why.clone();
            events.push(Event::VarEq {
                a: x,
                b: other,
                why: Justification::merged(why, &owhy),
            });
            return;
        }
        let constant = rhs.as_constant().is_some();
        self.insert_raw(x, rhs, why);
        if constant {
            events.push(Event::Constant { lhs: x });
        }
    }

    /// Substitute `x := p` into every dependent right-hand side.
    ///
    /// `p` must be canonical with respect to the set. Updated bindings that
    /// collapse or collide are removed and surfaced as events.
    pub fn fuse(&mut self, x: Var, p: &Polynomial, why: &Justification, events: &mut Vec<Event>) {
        for k in self.dependents_sorted(x) {
            let b = self.remove(k).expect("dependent is bound");
            let rhs = b.rhs.subst(x, p);
            let merged = Justification::merged(b.why, why);
            self.bind_checked(k, rhs, merged, events);
        }
    }

    /// Fuse `x := p` into the dependents, then bind `x ↦ p` (replacing any
    /// existing binding of `x`).
    pub fn compose(&mut self, x: Var, p: Polynomial, why: Justification, events: &mut Vec<Event>) {
        self.remove(x);
        self.fuse(x, &p, &why, events);
        self.bind_checked(x, p, why, events);
    }

    /// Structural audit of the solved form and the derived indices; used by
    /// tests and debug assertions.
    pub fn audit(&self) -> bool {
        for (x, b) in &self.find {
            // solved form: no lhs occurs in any rhs, rhs is not a bare var
            if b.rhs.as_var().is_some() {
                return false;
            }
            for m in b.rhs.terms() {
                if self.find.contains_key(&m.var) {
                    return false;
                }
                if !self.dep.get(&m.var).is_some_and(|s| s.contains(x)) {
                    return false;
                }
            }
            if self.inv.get(&b.rhs) != Some(x) {
                return false;
            }
            if b.rhs.constant_part().is_zero() != self.zeros.contains(x) {
                return false;
            }
            if b.rhs.as_constant().is_some() != self.constants.contains(x) {
                return false;
            }
        }
        self.inv.len() == self.find.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratify_core::{AtomId, VarTable};
    use ratify_math::rational::rat;

    fn setup() -> (VarTable, Var, Var, Var) {
        let mut table = VarTable::new();
        let k1 = table.fresh_slack(None);
        let k2 = table.fresh_slack(None);
        let k3 = table.fresh_slack(None);
        (table, k1, k2, k3)
    }

    fn j(n: u32) -> Justification {
        Justification::single(AtomId(n))
    }

    #[test]
    fn test_compose_substitutes_dependents() {
        let (_, k1, k2, k3) = setup();
        let mut s = SolutionSet::new();
        let mut ev = Vec::new();

        // k1 ↦ 3 - k2, then k2 ↦ 1 + k3
        let p1 = Polynomial::constant(rat(3)).sub(&Polynomial::var(k2));
        s.compose(k1, p1, j(0), &mut ev);
        let p2 = Polynomial::constant(rat(1)).add(&Polynomial::var(k3));
        s.compose(k2, p2, j(1), &mut ev);
        assert!(ev.is_empty());

        let rhs = s.rhs(k1).unwrap();
        assert_eq!(rhs.constant_part(), &rat(2));
        assert_eq!(rhs.coeff(k3), Some(&rat(-1)));
        // justification of the updated binding unions both atoms
        let why = &s.get(k1).unwrap().why;
        assert!(why.contains(AtomId(0)) && why.contains(AtomId(1)));
        assert!(s.audit());
    }

    #[test]
    fn test_collapse_to_bare_var_emits_equality() {
        let (_, k1, k2, k3) = setup();
        let mut s = SolutionSet::new();
        let mut ev = Vec::new();

        // k1 ↦ k2 + k3; composing k3 ↦ 0 collapses it to the bare k2
        let p = Polynomial::var(k2).add(&Polynomial::var(k3));
        s.compose(k1, p, j(0), &mut ev);
        s.compose(k3, Polynomial::zero(), j(1), &mut ev);

        assert!(!s.contains(k1));
        assert!(ev
            .iter()
            .any(|e| matches!(e, Event::VarEq { a, b, .. } if *a == k1 && *b == k2)));
        assert!(s.audit());
    }

    #[test]
    fn test_collision_emits_equality() {
        let (mut table, k1, k2, k3) = setup();
        let k4 = table.fresh_slack(None);
        let mut s = SolutionSet::new();
        let mut ev = Vec::new();

        // k1 ↦ 1 + k3, k2 ↦ 1 + k4; composing k4 ↦ k3 makes both right-hand
        // sides equal, so k2 = k1 is derived
        s.compose(k1, Polynomial::constant(rat(1)).add(&Polynomial::var(k3)), j(0), &mut ev);
        s.compose(k2, Polynomial::constant(rat(1)).add(&Polynomial::var(k4)), j(1), &mut ev);
        assert!(ev.is_empty());
        s.compose(k4, Polynomial::var(k3), j(2), &mut ev);

        assert!(ev
            .iter()
            .any(|e| matches!(e, Event::VarEq { a, b, why } if *a == k2 && *b == k1
                && why.contains(AtomId(0)) && why.contains(AtomId(1)) && why.contains(AtomId(2)))));
        assert!(s.audit());
    }

    #[test]
    fn test_norm_reports_used_justifications() {
        let (_, k1, k2, k3) = setup();
        let mut s = SolutionSet::new();
        let mut ev = Vec::new();
        s.compose(k1, Polynomial::constant(rat(2)).add(&Polynomial::var(k2)), j(0), &mut ev);

        let (p, why) = s.norm(&Polynomial::var(k1).add(&Polynomial::var(k3)));
        assert_eq!(p.constant_part(), &rat(2));
        assert!(p.contains(k2) && p.contains(k3) && !p.contains(k1));
        assert!(why.contains(AtomId(0)));

        // a polynomial without bound variables is untouched
        let (q, why2) = s.norm(&Polynomial::var(k3));
        assert_eq!(q, Polynomial::var(k3));
        assert!(why2.is_empty());
    }
}
