//! Property-based tests for polynomial and Diophantine algebra.

use proptest::prelude::*;
use ratify_core::{Dom, Var, VarTable};
use ratify_math::polynomial::{Monomial, Polynomial, Solution};
use ratify_math::rational::rat;

fn table_with_vars(n: usize, dom: Dom) -> (VarTable, Vec<Var>) {
    let mut table = VarTable::new();
    let vars = (0..n)
        .map(|i| table.external(&format!("x{}", i), Some(dom)))
        .collect();
    (table, vars)
}

fn build(vars: &[Var], coeffs: &[i64], constant: i64) -> Polynomial {
    Polynomial::from_parts(
        rat(constant),
        vars.iter()
            .zip(coeffs)
            .filter(|(_, c)| **c != 0)
            .map(|(v, c)| Monomial {
                var: *v,
                coeff: rat(*c),
            })
            .collect(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn add_then_sub_is_identity(
        a in prop::collection::vec(-9i64..=9, 4),
        b in prop::collection::vec(-9i64..=9, 4),
        ca in -20i64..=20,
        cb in -20i64..=20,
    ) {
        let (_, vars) = table_with_vars(4, Dom::Real);
        let p = build(&vars, &a, ca);
        let q = build(&vars, &b, cb);
        prop_assert_eq!(p.add(&q).sub(&q), p.clone());
        prop_assert!(p.sub(&p).is_zero());
    }

    #[test]
    fn isolate_satisfies_the_equation(
        coeffs in prop::collection::vec(-9i64..=9, 4),
        constant in -20i64..=20,
        pick in 0usize..4,
    ) {
        prop_assume!(coeffs[pick] != 0);
        let (_, vars) = table_with_vars(4, Dom::Real);
        let d = build(&vars, &coeffs, constant);
        let x = vars[pick];
        let p = d.isolate(x);
        prop_assert!(!p.contains(x));
        // substituting the solved form back refutes nothing: d[x := p] = 0
        prop_assert!(d.subst(x, &p).is_zero());
    }

    #[test]
    fn solve_zero_bindings_satisfy_the_equation(
        coeffs in prop::collection::vec(-9i64..=9, 3),
        constant in -20i64..=20,
    ) {
        let (_, vars) = table_with_vars(3, Dom::Real);
        let d = build(&vars, &coeffs, constant);
        match Polynomial::solve_zero(&d) {
            Solution::Valid => prop_assert!(d.is_zero()),
            Solution::Inconsistent => {
                prop_assert!(d.terms().is_empty() && !d.is_zero())
            }
            Solution::Solved(bindings) => {
                let mut residue = d.clone();
                for (x, p) in &bindings {
                    prop_assert!(!p.contains(*x));
                    residue = residue.subst(*x, p);
                }
                prop_assert!(residue.is_zero());
            }
        }
    }

    #[test]
    fn dioph_solutions_satisfy_the_equation(
        coeffs in prop::collection::vec(-6i64..=6, 3),
        constant in -15i64..=15,
    ) {
        let (mut table, vars) = table_with_vars(3, Dom::Int);
        let d = build(&vars, &coeffs, constant);
        match ratify_math::dioph::solve_zero(&d, &mut table) {
            Solution::Valid => prop_assert!(d.is_zero()),
            Solution::Inconsistent => prop_assert!(!d.is_zero()),
            Solution::Solved(bindings) => {
                let mut residue = d.clone();
                for (x, p) in &bindings {
                    prop_assert!(!p.contains(*x));
                    residue = residue.subst(*x, p);
                }
                prop_assert!(residue.is_zero());
                // solved forms are over free variables and parameters only
                for (_, p) in &bindings {
                    for (x, _) in &bindings {
                        prop_assert!(!p.contains(*x));
                    }
                }
            }
        }
    }
}
