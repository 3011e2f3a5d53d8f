//! The Shostak-style interface between the core and sibling theories.
//!
//! The arithmetic engine is one of several theories sharing the variable
//! partition. Siblings (uninterpreted functions, tuples, functional arrays)
//! plug in through this trait: a `sigma` normalising an application of their
//! symbols, a `solve` turning an equality into solved variable bindings, and
//! a `map` substituting variables through their terms. The partition is the
//! shared medium; any theory may merge, dismerge or query it through the
//! engine.

use ratify_core::{Justification, Result, Var, VarTable};
use ratify_math::polynomial::{Polynomial, Solution};

/// The component theories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TheoryId {
    /// Linear arithmetic (`A`).
    Arith,
    /// Uninterpreted function symbols (`U`).
    Uninterp,
    /// Tuples and projections (`T`).
    Tuple,
    /// Functional arrays (`F`).
    Array,
}

/// Contract a sibling solver provides to the combination.
pub trait ShostakTheory {
    /// The theory's term representation.
    type Term;

    /// Which theory this solver implements.
    fn id(&self) -> TheoryId;

    /// Normalise an application of one of the theory's symbols.
    fn sigma(&mut self, table: &mut VarTable, op: &str, args: &[Self::Term]) -> Self::Term;

    /// Turn `lhs = rhs` into solved variable bindings, or fail with
    /// `Inconsistent`.
    fn solve(
        &mut self,
        table: &mut VarTable,
        lhs: &Self::Term,
        rhs: &Self::Term,
        why: &Justification,
    ) -> Result<Vec<(Var, Self::Term)>>;

    /// Substitute variables through a term.
    fn map(&mut self, f: &mut dyn FnMut(Var) -> Option<Self::Term>, t: &Self::Term) -> Self::Term;
}

/// The arithmetic instance of the contract, backed by the polynomial engine.
#[derive(Debug, Default)]
pub struct ArithTheory;

impl ShostakTheory for ArithTheory {
    type Term = Polynomial;

    fn id(&self) -> TheoryId {
        TheoryId::Arith
    }

    fn sigma(&mut self, table: &mut VarTable, op: &str, args: &[Polynomial]) -> Polynomial {
        match (op, args) {
            ("+", _) => args.iter().fold(Polynomial::zero(), |acc, a| acc.add(a)),
            ("-", [a]) => a.neg(),
            ("-", [a, rest @ ..]) => rest.iter().fold(a.clone(), |acc, b| acc.sub(b)),
            ("*", [a, b]) => {
                if let Some(c) = a.as_constant() {
                    b.scale(c)
                } else if let Some(c) = b.as_constant() {
                    a.scale(c)
                } else {
                    // nonlinear products fall outside the theory; name them
                    Polynomial::var(table.fresh_rename(None))
                }
            }
            _ => Polynomial::var(table.fresh_rename(None)),
        }
    }

    fn solve(
        &mut self,
        table: &mut VarTable,
        lhs: &Polynomial,
        rhs: &Polynomial,
        why: &Justification,
    ) -> Result<Vec<(Var, Polynomial)>> {
        let d = lhs.sub(rhs);
        let solution = if !d.terms().is_empty() && d.is_diophantine(table) {
            ratify_math::dioph::solve_zero(&d, table)
        } else {
            Polynomial::solve_zero(&d)
        };
        match solution {
            Solution::Valid => Ok(Vec::new()),
            Solution::Inconsistent => Err(ratify_core::RatifyError::Inconsistent(why.clone())),
            Solution::Solved(bindings) => Ok(bindings),
        }
    }

    fn map(
        &mut self,
        f: &mut dyn FnMut(Var) -> Option<Polynomial>,
        t: &Polynomial,
    ) -> Polynomial {
        let mut out = t.clone();
        let vars: Vec<Var> = t.vars().collect();
        for v in vars {
            if let Some(p) = f(v) {
                out = out.subst(v, &p);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratify_core::VarTable;
    use ratify_math::rational::rat;

    #[test]
    fn test_arith_solve_is_solved_form() {
        let mut table = VarTable::new();
        let x = table.external("x", None);
        let y = table.external("y", None);
        let mut th = ArithTheory;
        let lhs = Polynomial::var(x).add(&Polynomial::var(y));
        let rhs = Polynomial::constant(rat(3));
        let bindings = th
            .solve(&mut table, &lhs, &rhs, &Justification::empty())
            .unwrap();
        assert_eq!(bindings.len(), 1);
        let (v, p) = &bindings[0];
        assert!(!p.contains(*v));
    }

    #[test]
    fn test_arith_map_substitutes() {
        let mut table = VarTable::new();
        let x = table.external("x", None);
        let mut th = ArithTheory;
        let t = Polynomial::var(x).scale(&rat(2));
        let mapped = th.map(&mut |v| (v == x).then(|| Polynomial::constant(rat(5))), &t);
        assert_eq!(mapped.as_constant(), Some(&rat(10)));
    }
}
