//! Diophantine solving for linear integer equations.
//!
//! Solves a single equation `Σ cᵢ·xᵢ + c₀ = 0` whose variables are all
//! integer-constrained. Unit coefficients eliminate directly; otherwise a
//! fresh integer parameter absorbs the quotients by the minimum-magnitude
//! coefficient, shrinking coefficients like the Euclidean algorithm until a
//! unit appears. The result is a list of solved forms over the remaining
//! variables and the fresh parameters.

use crate::polynomial::{Monomial, Polynomial, Solution};
use crate::rational::{denom_lcm, div_rem_euclid};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use ratify_core::{Dom, Var, VarTable};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// One raw elimination step: `lhs = Σ coeffs·y + constant`, possibly
/// referencing parameters solved by later steps.
struct RawBinding {
    lhs: Var,
    coeffs: BTreeMap<Var, BigInt>,
    constant: BigInt,
}

/// Solve `d = 0` over the integers.
///
/// Callers guarantee that every variable of `d` is integer-constrained;
/// fresh `Int` parameters are drawn from the table.
pub fn solve_zero(d: &Polynomial, table: &mut VarTable) -> Solution {
    // clear denominators
    let lcm = denom_lcm(
        d.terms()
            .iter()
            .map(|m| &m.coeff)
            .chain(std::iter::once(d.constant_part())),
    );
    let scaled = d.scale(&BigRational::from_integer(lcm));

    let mut coeffs: BTreeMap<Var, BigInt> = scaled
        .terms()
        .iter()
        .map(|m| (m.var, m.coeff.to_integer()))
        .collect();
    let mut constant = scaled.constant_part().to_integer();

    if coeffs.is_empty() {
        return if constant.is_zero() {
            Solution::Valid
        } else {
            Solution::Inconsistent
        };
    }

    // GCD test and normalisation
    let mut g = BigInt::zero();
    for c in coeffs.values() {
        g = g.gcd(c);
    }
    if !(&constant % &g).is_zero() {
        return Solution::Inconsistent;
    }
    if !g.is_one() {
        for c in coeffs.values_mut() {
            *c = &*c / &g;
        }
        constant = &constant / &g;
    }

    let mut raw: Vec<RawBinding> = Vec::new();
    loop {
        if coeffs.is_empty() {
            if constant.is_zero() {
                break;
            }
            return Solution::Inconsistent;
        }
        if coeffs.len() == 1 {
            let (&x, a) = coeffs.iter().next().expect("nonempty");
            let (q, r) = (-&constant).div_rem(a);
            if !r.is_zero() {
                return Solution::Inconsistent;
            }
            raw.push(RawBinding {
                lhs: x,
                coeffs: BTreeMap::new(),
                constant: q,
            });
            break;
        }

        let (x, a) = coeffs
            .iter()
            .min_by(|(va, ca), (vb, cb)| ca.abs().cmp(&cb.abs()).then(va.cmp(vb)))
            .map(|(&v, c)| (v, c.clone()))
            .expect("nonempty");
        coeffs.remove(&x);

        if a.abs().is_one() {
            // x = Σ (-cᵢ/a)·yᵢ − c₀/a, exact since |a| = 1
            let rhs: BTreeMap<Var, BigInt> =
                coeffs.iter().map(|(&y, c)| (y, -(c / &a))).collect();
            raw.push(RawBinding {
                lhs: x,
                coeffs: rhs,
                constant: -(&constant / &a),
            });
            break;
        }

        // introduce t = x + Σ qᵢ·yᵢ + q_c; the equation keeps coefficient a
        // on t while every other coefficient drops below |a|
        let t = table.fresh_param(Some(Dom::Int));
        let mut rhs: BTreeMap<Var, BigInt> = BTreeMap::new();
        rhs.insert(t, BigInt::one());
        let mut next: BTreeMap<Var, BigInt> = BTreeMap::new();
        next.insert(t, a.clone());
        for (&y, c) in &coeffs {
            let (q, r) = div_rem_euclid(c, &a);
            if !q.is_zero() {
                rhs.insert(y, -q);
            }
            if !r.is_zero() {
                next.insert(y, r);
            }
        }
        let (qc, rc) = div_rem_euclid(&constant, &a);
        raw.push(RawBinding {
            lhs: x,
            coeffs: rhs,
            constant: -qc,
        });
        coeffs = next;
        constant = rc;
    }

    // Back-substitute later bindings into earlier right-hand sides so every
    // solved form is over free variables and parameters only.
    let mut resolved: FxHashMap<Var, Polynomial> = FxHashMap::default();
    let mut out: Vec<(Var, Polynomial)> = Vec::with_capacity(raw.len());
    for binding in raw.iter().rev() {
        let mut p = Polynomial::from_parts(
            BigRational::from_integer(binding.constant.clone()),
            binding
                .coeffs
                .iter()
                .map(|(&v, c)| Monomial {
                    var: v,
                    coeff: BigRational::from_integer(c.clone()),
                })
                .collect(),
        );
        let bound: Vec<Var> = p.vars().filter(|v| resolved.contains_key(v)).collect();
        for v in bound {
            p = p.subst(v, &resolved[&v]);
        }
        resolved.insert(binding.lhs, p.clone());
        out.push((binding.lhs, p));
    }
    out.reverse();
    Solution::Solved(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::rat;

    fn int_var(table: &mut VarTable, name: &str) -> Var {
        table.external(name, Some(Dom::Int))
    }

    fn check_identity(d: &Polynomial, bindings: &[(Var, Polynomial)]) {
        let mut residue = d.clone();
        for (x, p) in bindings {
            residue = residue.subst(*x, p);
        }
        assert!(residue.is_zero(), "bindings must satisfy the equation");
    }

    #[test]
    fn test_unit_coefficient() {
        let mut table = VarTable::new();
        let x = int_var(&mut table, "x");
        let y = int_var(&mut table, "y");
        // x + 2y - 5 = 0
        let d = Polynomial::var(x)
            .add(&Polynomial::var(y).scale(&rat(2)))
            .sub(&Polynomial::constant(rat(5)));
        match super::solve_zero(&d, &mut table) {
            Solution::Solved(bs) => {
                check_identity(&d, &bs);
                assert_eq!(bs.len(), 1);
            }
            other => panic!("expected solved form, got {:?}", other),
        }
    }

    #[test]
    fn test_parameterised_solution() {
        let mut table = VarTable::new();
        let x = int_var(&mut table, "x");
        let y = int_var(&mut table, "y");
        // 2x + 3y - 7 = 0 needs a fresh parameter
        let d = Polynomial::var(x)
            .scale(&rat(2))
            .add(&Polynomial::var(y).scale(&rat(3)))
            .sub(&Polynomial::constant(rat(7)));
        match super::solve_zero(&d, &mut table) {
            Solution::Solved(bs) => {
                check_identity(&d, &bs);
                assert_eq!(bs.len(), 2);
                // right-hand sides are free of solved variables
                for (_, p) in &bs {
                    for (lhs, _) in &bs {
                        assert!(!p.contains(*lhs));
                    }
                }
            }
            other => panic!("expected solved form, got {:?}", other),
        }
    }

    #[test]
    fn test_gcd_infeasible() {
        let mut table = VarTable::new();
        let x = int_var(&mut table, "x");
        let y = int_var(&mut table, "y");
        // 2x + 4y - 7 = 0 has no integer solutions
        let d = Polynomial::var(x)
            .scale(&rat(2))
            .add(&Polynomial::var(y).scale(&rat(4)))
            .sub(&Polynomial::constant(rat(7)));
        assert_eq!(super::solve_zero(&d, &mut table), Solution::Inconsistent);
    }

    #[test]
    fn test_single_variable() {
        let mut table = VarTable::new();
        let x = int_var(&mut table, "x");
        let d = Polynomial::var(x).scale(&rat(3)).sub(&Polynomial::constant(rat(9)));
        match super::solve_zero(&d, &mut table) {
            Solution::Solved(bs) => {
                assert_eq!(bs[0].0, x);
                assert_eq!(bs[0].1.as_constant(), Some(&rat(3)));
            }
            other => panic!("expected solved form, got {:?}", other),
        }
        let d2 = Polynomial::var(x).scale(&rat(3)).sub(&Polynomial::constant(rat(8)));
        assert_eq!(super::solve_zero(&d2, &mut table), Solution::Inconsistent);
    }

    #[test]
    fn test_degenerate() {
        let mut table = VarTable::new();
        assert_eq!(
            super::solve_zero(&Polynomial::zero(), &mut table),
            Solution::Valid
        );
        assert_eq!(
            super::solve_zero(&Polynomial::constant(rat(1)), &mut table),
            Solution::Inconsistent
        );
    }
}
