//! Canonical linear polynomials.
//!
//! A polynomial is an exact rational constant plus monomials over distinct
//! variables, kept sorted by the global variable order with nonzero
//! coefficients only. Structural equality and hashing therefore coincide
//! with semantic equality, which the solution sets rely on for their
//! inverse-functional indices.
//!
//! Because slack variables are numerically below all non-slack variables,
//! the sorted representation keeps any non-slack monomials at the tail.

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use ratify_core::{Var, VarTable};
use std::fmt;

/// A single `coeff·var` term with a nonzero coefficient.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Monomial {
    /// The variable.
    pub var: Var,
    /// The (nonzero) coefficient.
    pub coeff: BigRational,
}

impl fmt::Debug for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}·{:?}", self.coeff, self.var)
    }
}

/// Canonical linear polynomial `c₀ + Σ cᵢ·xᵢ`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Polynomial {
    constant: BigRational,
    terms: Vec<Monomial>,
}

/// Result of solving a linear equation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Solution {
    /// The equation holds identically.
    Valid,
    /// The equation is refutable on its own (e.g. `0 = 1`).
    Inconsistent,
    /// Equivalent solved forms `xᵢ = aᵢ` with `xᵢ ∉ vars(aᵢ)`.
    Solved(Vec<(Var, Polynomial)>),
}

impl Polynomial {
    /// The zero polynomial.
    pub fn zero() -> Self {
        Polynomial {
            constant: BigRational::zero(),
            terms: Vec::new(),
        }
    }

    /// A constant polynomial.
    pub fn constant(q: BigRational) -> Self {
        Polynomial {
            constant: q,
            terms: Vec::new(),
        }
    }

    /// The polynomial `1·v`.
    pub fn var(v: Var) -> Self {
        Polynomial {
            constant: BigRational::zero(),
            terms: vec![Monomial {
                var: v,
                coeff: BigRational::from_integer(1.into()),
            }],
        }
    }

    /// Build from a constant and arbitrary terms; sorts, merges duplicate
    /// variables and drops zero coefficients.
    pub fn from_parts(constant: BigRational, mut terms: Vec<Monomial>) -> Self {
        terms.sort_by_key(|m| m.var);
        let mut merged: Vec<Monomial> = Vec::with_capacity(terms.len());
        for m in terms {
            match merged.last_mut() {
                Some(last) if last.var == m.var => last.coeff += m.coeff,
                _ => merged.push(m),
            }
        }
        merged.retain(|m| !m.coeff.is_zero());
        Polynomial {
            constant,
            terms: merged,
        }
    }

    /// The constant part `|a|`.
    pub fn constant_part(&self) -> &BigRational {
        &self.constant
    }

    /// The monomials, ascending by variable.
    pub fn terms(&self) -> &[Monomial] {
        &self.terms
    }

    /// Whether this is the zero polynomial.
    pub fn is_zero(&self) -> bool {
        self.constant.is_zero() && self.terms.is_empty()
    }

    /// The constant value, when no monomials are present.
    pub fn as_constant(&self) -> Option<&BigRational> {
        self.terms.is_empty().then_some(&self.constant)
    }

    /// The bare variable `v` when this polynomial is exactly `1·v`.
    pub fn as_var(&self) -> Option<Var> {
        match (self.constant.is_zero(), self.terms.as_slice()) {
            (true, [m]) if m.coeff.is_one() => Some(m.var),
            _ => None,
        }
    }

    /// Coefficient of a variable, if present.
    pub fn coeff(&self, v: Var) -> Option<&BigRational> {
        self.terms
            .binary_search_by_key(&v, |m| m.var)
            .ok()
            .map(|i| &self.terms[i].coeff)
    }

    /// Whether the variable occurs.
    pub fn contains(&self, v: Var) -> bool {
        self.terms.binary_search_by_key(&v, |m| m.var).is_ok()
    }

    /// The variables, ascending.
    pub fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.terms.iter().map(|m| m.var)
    }

    /// Monomials with positive coefficient (`a⁺`), ascending by variable.
    pub fn pos_terms(&self) -> impl Iterator<Item = &Monomial> {
        self.terms.iter().filter(|m| m.coeff.is_positive())
    }

    /// Monomials with negative coefficient (`a⁻`), ascending by variable.
    pub fn neg_terms(&self) -> impl Iterator<Item = &Monomial> {
        self.terms.iter().filter(|m| m.coeff.is_negative())
    }

    /// Whether `a⁺` is nonempty.
    pub fn has_pos(&self) -> bool {
        self.terms.iter().any(|m| m.coeff.is_positive())
    }

    /// Whether `a⁻` is nonempty.
    pub fn has_neg(&self) -> bool {
        self.terms.iter().any(|m| m.coeff.is_negative())
    }

    /// Least positive monomial by variable order.
    pub fn least_pos(&self) -> Option<&Monomial> {
        self.pos_terms().next()
    }

    /// Least negative monomial by variable order.
    pub fn least_neg(&self) -> Option<&Monomial> {
        self.neg_terms().next()
    }

    /// Greatest variable, if any.
    pub fn greatest_var(&self) -> Option<Var> {
        self.terms.last().map(|m| m.var)
    }

    /// Greatest non-slack variable. Since slacks sort below non-slacks this
    /// is the last term exactly when that term is non-slack.
    pub fn greatest_nonslack(&self) -> Option<Var> {
        self.terms
            .last()
            .map(|m| m.var)
            .filter(|v| !v.is_slack())
    }

    /// Whether every variable is a slack (the term is *restricted*).
    pub fn is_restricted(&self) -> bool {
        self.terms.last().map_or(true, |m| m.var.is_slack())
    }

    /// Whether every variable is integer-constrained.
    pub fn is_diophantine(&self, table: &VarTable) -> bool {
        self.vars().all(|v| table.is_int(v))
    }

    /// Sum of two polynomials.
    pub fn add(&self, other: &Polynomial) -> Polynomial {
        self.combine(other, |c| c.clone())
    }

    /// Difference of two polynomials.
    pub fn sub(&self, other: &Polynomial) -> Polynomial {
        self.combine(other, |c| -c)
    }

    /// `self + factor·other`.
    pub fn add_scaled(&self, other: &Polynomial, factor: &BigRational) -> Polynomial {
        if factor.is_zero() {
            return self.clone();
        }
        self.combine(other, |c| c * factor)
    }

    fn combine(
        &self,
        other: &Polynomial,
        map: impl Fn(&BigRational) -> BigRational,
    ) -> Polynomial {
        let mut terms = Vec::with_capacity(self.terms.len() + other.terms.len());
        let (mut i, mut j) = (0, 0);
        while i < self.terms.len() && j < other.terms.len() {
            let (a, b) = (&self.terms[i], &other.terms[j]);
            match a.var.cmp(&b.var) {
                std::cmp::Ordering::Less => {
                    terms.push(a.clone());
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    terms.push(Monomial {
                        var: b.var,
                        coeff: map(&b.coeff),
                    });
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    let coeff = &a.coeff + map(&b.coeff);
                    if !coeff.is_zero() {
                        terms.push(Monomial { var: a.var, coeff });
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        terms.extend_from_slice(&self.terms[i..]);
        for b in &other.terms[j..] {
            terms.push(Monomial {
                var: b.var,
                coeff: map(&b.coeff),
            });
        }
        Polynomial {
            constant: &self.constant + map(&other.constant),
            terms,
        }
    }

    /// Negation.
    pub fn neg(&self) -> Polynomial {
        Polynomial {
            constant: -&self.constant,
            terms: self
                .terms
                .iter()
                .map(|m| Monomial {
                    var: m.var,
                    coeff: -&m.coeff,
                })
                .collect(),
        }
    }

    /// Scalar multiple.
    pub fn scale(&self, factor: &BigRational) -> Polynomial {
        if factor.is_zero() {
            return Polynomial::zero();
        }
        Polynomial {
            constant: &self.constant * factor,
            terms: self
                .terms
                .iter()
                .map(|m| Monomial {
                    var: m.var,
                    coeff: &m.coeff * factor,
                })
                .collect(),
        }
    }

    /// Polynomial with the monomial of `v` removed.
    fn without(&self, v: Var) -> Polynomial {
        Polynomial {
            constant: self.constant.clone(),
            terms: self
                .terms
                .iter()
                .filter(|m| m.var != v)
                .cloned()
                .collect(),
        }
    }

    /// Substitute `v := p`; the identity when `v` does not occur.
    pub fn subst(&self, v: Var, p: &Polynomial) -> Polynomial {
        match self.coeff(v) {
            None => self.clone(),
            Some(c) => {
                let c = c.clone();
                self.without(v).add_scaled(p, &c)
            }
        }
    }

    /// Isolate `v` from `self = 0`, returning `p` with `v = p`, `v ∉ vars(p)`.
    ///
    /// Panics if `v` does not occur; callers must have the monomial in hand.
    pub fn isolate(&self, v: Var) -> Polynomial {
        let c = self
            .coeff(v)
            .cloned()
            .unwrap_or_else(|| panic!("isolated variable {:?} must occur", v));
        let inv = BigRational::from_integer((-1).into()) / c;
        self.without(v).scale(&inv)
    }

    /// Solve `a = b`.
    pub fn solve(a: &Polynomial, b: &Polynomial) -> Solution {
        Polynomial::solve_zero(&a.sub(b))
    }

    /// Solve `d = 0` over the rationals, isolating the greatest variable so
    /// external variables are expressed over internal ones.
    pub fn solve_zero(d: &Polynomial) -> Solution {
        match d.greatest_var() {
            None => {
                if d.constant.is_zero() {
                    Solution::Valid
                } else {
                    Solution::Inconsistent
                }
            }
            Some(x) => Solution::Solved(vec![(x, d.isolate(x))]),
        }
    }
}

impl fmt::Debug for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.constant)?;
        for m in &self.terms {
            if m.coeff.is_negative() {
                write!(f, " - {}·{:?}", -&m.coeff, m.var)?;
            } else {
                write!(f, " + {}·{:?}", m.coeff, m.var)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::{rat, ratio};
    use ratify_core::VarTable;

    fn setup() -> (VarTable, Var, Var, Var) {
        let mut table = VarTable::new();
        let x = table.external("x", None);
        let y = table.external("y", None);
        let k = table.fresh_slack(None);
        (table, x, y, k)
    }

    #[test]
    fn test_from_parts_normalises() {
        let (_, x, y, _) = setup();
        let p = Polynomial::from_parts(
            rat(1),
            vec![
                Monomial { var: y, coeff: rat(2) },
                Monomial { var: x, coeff: rat(3) },
                Monomial { var: y, coeff: rat(-2) },
            ],
        );
        assert_eq!(p.coeff(x), Some(&rat(3)));
        assert!(!p.contains(y));
    }

    #[test]
    fn test_add_sub_cancel() {
        let (_, x, y, _) = setup();
        let p = Polynomial::var(x).add(&Polynomial::var(y).scale(&rat(2)));
        let q = p.sub(&p);
        assert!(q.is_zero());
    }

    #[test]
    fn test_subst() {
        let (_, x, y, k) = setup();
        // x + 2y with y := 3 - k  gives  6 + x - 2k
        let p = Polynomial::var(x).add(&Polynomial::var(y).scale(&rat(2)));
        let r = Polynomial::constant(rat(3)).sub(&Polynomial::var(k));
        let q = p.subst(y, &r);
        assert_eq!(q.constant_part(), &rat(6));
        assert_eq!(q.coeff(x), Some(&rat(1)));
        assert_eq!(q.coeff(k), Some(&rat(-2)));
        assert!(!q.contains(y));
    }

    #[test]
    fn test_isolate() {
        let (_, x, y, _) = setup();
        // 6 - 2x + 3y = 0  isolating x:  x = 3 + 3/2·y
        let d = Polynomial::from_parts(
            rat(6),
            vec![
                Monomial { var: x, coeff: rat(-2) },
                Monomial { var: y, coeff: rat(3) },
            ],
        );
        let p = d.isolate(x);
        assert_eq!(p.constant_part(), &rat(3));
        assert_eq!(p.coeff(y), Some(&ratio(3, 2)));
        assert!(!p.contains(x));
    }

    #[test]
    fn test_solve_picks_greatest_var() {
        let (_, x, y, k) = setup();
        // k + x - y = 0 solves for y (externals above slacks, y created after x)
        let d = Polynomial::var(k)
            .add(&Polynomial::var(x))
            .sub(&Polynomial::var(y));
        match Polynomial::solve_zero(&d) {
            Solution::Solved(bs) => {
                assert_eq!(bs.len(), 1);
                assert_eq!(bs[0].0, y);
                assert!(!bs[0].1.contains(y));
            }
            other => panic!("expected solved form, got {:?}", other),
        }
    }

    #[test]
    fn test_solve_degenerate() {
        assert_eq!(
            Polynomial::solve_zero(&Polynomial::zero()),
            Solution::Valid
        );
        assert_eq!(
            Polynomial::solve_zero(&Polynomial::constant(rat(2))),
            Solution::Inconsistent
        );
    }

    #[test]
    fn test_sign_views() {
        let (_, x, _, k) = setup();
        let p = Polynomial::from_parts(
            rat(0),
            vec![
                Monomial { var: k, coeff: rat(-1) },
                Monomial { var: x, coeff: rat(2) },
            ],
        );
        assert_eq!(p.least_pos().unwrap().var, x);
        assert_eq!(p.least_neg().unwrap().var, k);
        assert!(!p.is_restricted());
        assert_eq!(p.greatest_nonslack(), Some(x));
    }
}
