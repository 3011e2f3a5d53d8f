//! End-to-end scenarios for the decision procedure facade.

use num_traits::Zero;
use ratify_core::{AtomId, Dom, RatifyError, Status};
use ratify_math::rational::rat;
use ratify_math::Polynomial;
use ratify_solver::{Context, Extremum, Formula, TheoryId};

fn real(ctx: &mut Context, name: &str) -> Polynomial {
    Polynomial::var(ctx.declare(name, Some(Dom::Real)))
}

fn int(ctx: &mut Context, name: &str) -> Polynomial {
    Polynomial::var(ctx.declare(name, Some(Dom::Int)))
}

fn c(n: i64) -> Polynomial {
    Polynomial::constant(rat(n))
}

#[test]
fn scenario_equality_and_inequalities() {
    let mut ctx = Context::new();
    let x = real(&mut ctx, "x");
    let y = real(&mut ctx, "y");

    assert!(ctx.process(Formula::eq(x.add(&y), c(3))).is_sat());
    assert!(ctx.process(Formula::ge(x.clone(), c(0))).is_sat());
    assert!(ctx.process(Formula::ge(y.clone(), c(0))).is_sat());
    assert!(ctx.process(Formula::eq(x.sub(&y), c(1))).is_sat());

    let vx = x.as_var().unwrap();
    let vy = y.as_var().unwrap();
    let fx = ctx.find(TheoryId::Arith, vx).unwrap();
    let fy = ctx.find(TheoryId::Arith, vy).unwrap();
    assert_eq!(fx.as_constant(), Some(&rat(2)));
    assert_eq!(fy.as_constant(), Some(&rat(1)));
    assert!(ctx.audit());
}

#[test]
fn scenario_infeasible_bounds_and_core_minimality() {
    let mut ctx = Context::new();
    let x = real(&mut ctx, "x");

    ctx.process(Formula::ge(x.clone(), c(5)));
    let status = ctx.process(Formula::le(x.clone(), c(2)));
    let core = status.core().expect("unsat").clone();
    assert_eq!(core.len(), 2);
    assert!(core.contains(AtomId(0)) && core.contains(AtomId(1)));

    // the core replayed in either order is unsat; any strict subset is sat
    let formulas = [Formula::ge(x.clone(), c(5)), Formula::le(x.clone(), c(2))];
    for order in [[0, 1], [1, 0]] {
        let mut replay = Context::new();
        let x2 = real(&mut replay, "x");
        let fs = [
            Formula::ge(x2.clone(), c(5)),
            Formula::le(x2.clone(), c(2)),
        ];
        replay.process(fs[order[0]].clone());
        assert!(replay.process(fs[order[1]].clone()).is_unsat());
    }
    for keep in 0..formulas.len() {
        let mut replay = Context::new();
        let x2 = real(&mut replay, "x");
        let fs = [Formula::ge(x2.clone(), c(5)), Formula::le(x2, c(2))];
        assert!(replay.process(fs[keep].clone()).is_sat());
    }
}

#[test]
fn scenario_integer_disequality_split() {
    let mut ctx = Context::new();
    let x = int(&mut ctx, "x");

    assert!(ctx.process(Formula::ge(x.clone(), c(0))).is_sat());
    assert!(ctx.process(Formula::le(x.clone(), c(2))).is_sat());
    assert!(ctx.process(Formula::diseq(x.clone(), c(1))).is_sat());

    assert_eq!(ctx.sup(&x).unwrap(), Extremum::Finite(rat(2)));
    assert_eq!(ctx.inf(&x).unwrap(), Extremum::Finite(rat(0)));

    // pinning the excluded value refutes the context
    assert!(ctx.process(Formula::eq(x, c(1))).is_unsat());
}

#[test]
fn scenario_entailed_equalities_from_zero_analysis() {
    let mut ctx = Context::new();
    let x = real(&mut ctx, "x");
    let y = real(&mut ctx, "y");

    ctx.process(Formula::ge(x.clone(), c(0)));
    ctx.process(Formula::ge(y.clone(), c(0)));
    assert!(ctx.process(Formula::le(x.add(&y), c(0))).is_sat());

    let vx = x.as_var().unwrap();
    let vy = y.as_var().unwrap();
    let fx = ctx.find(TheoryId::Arith, vx).unwrap();
    let fy = ctx.find(TheoryId::Arith, vy).unwrap();
    assert!(fx.as_constant().is_some_and(|q| q.is_zero()));
    assert!(fy.as_constant().is_some_and(|q| q.is_zero()));
    assert!(ctx.audit());
}

#[test]
fn scenario_unbounded_objective() {
    let mut ctx = Context::new();
    let x = real(&mut ctx, "x");
    ctx.process(Formula::ge(x.clone(), c(0)));
    assert_eq!(ctx.sup(&x).unwrap(), Extremum::Unbounded);
    assert_eq!(ctx.inf(&x).unwrap(), Extremum::Finite(rat(0)));
}

#[test]
fn scenario_gomory_tightening() {
    let mut ctx = Context::new();
    let x = int(&mut ctx, "x");
    let y = int(&mut ctx, "y");

    let lhs = x.scale(&rat(2)).add(&y.scale(&rat(3)));
    assert!(ctx.process(Formula::eq(lhs, c(7))).is_sat());
    assert!(ctx.process(Formula::ge(x.clone(), c(0))).is_sat());
    assert!(ctx.process(Formula::ge(y.clone(), c(0))).is_sat());

    // after cutting, the integer hull bounds are derivable via sup
    match ctx.sup(&x).unwrap() {
        Extremum::Finite(q) => assert!(q <= rat(3)),
        Extremum::Unbounded => panic!("x is bounded"),
    }
    match ctx.sup(&y).unwrap() {
        Extremum::Finite(q) => assert!(q <= rat(2)),
        Extremum::Unbounded => panic!("y is bounded"),
    }
    assert!(ctx.audit());
}

#[test]
fn sup_refutes_its_own_bound() {
    // a finite supremum refutes any strictly larger bound
    let mut ctx = Context::new();
    let x = real(&mut ctx, "x");
    let y = real(&mut ctx, "y");
    ctx.process(Formula::ge(x.clone(), c(0)));
    ctx.process(Formula::ge(y.clone(), c(0)));
    ctx.process(Formula::le(x.add(&y.scale(&rat(2))), c(8)));

    let objective = x.add(&y);
    let Extremum::Finite(q) = ctx.sup(&objective).unwrap() else {
        panic!("objective is bounded");
    };
    assert_eq!(q, rat(8));
    assert!(ctx
        .process(Formula::gt(objective, Polynomial::constant(q)))
        .is_unsat());
}

#[test]
fn canonical_forms_are_idempotent() {
    // canonical forms are fixed points of can
    let mut ctx = Context::new();
    let x = real(&mut ctx, "x");
    let y = real(&mut ctx, "y");
    ctx.process(Formula::eq(x.add(&y), c(3)));
    ctx.process(Formula::ge(x.clone(), c(1)));

    for t in [x.clone(), y.clone(), x.add(&y), x.sub(&y).scale(&rat(5))] {
        let once = ctx.can(&t);
        let twice = ctx.can(&once);
        assert_eq!(once, twice);
    }
}

#[test]
fn find_inverts_inv() {
    // find inverts inv whenever inv is defined
    let mut ctx = Context::new();
    let x = real(&mut ctx, "x");
    ctx.process(Formula::ge(x.clone(), c(2)));

    let t = x.add(&c(1));
    let named = ctx.name(&t);
    let back = ctx.inv(&t).unwrap();
    assert_eq!(named, back);
    assert_eq!(
        ctx.find(TheoryId::Arith, named).unwrap(),
        ctx.can(&t)
    );

    // unknown terms report not-found
    let fresh = real(&mut ctx, "unnamed");
    assert_eq!(
        ctx.inv(&fresh.add(&c(42))),
        Err(RatifyError::NotFound)
    );
}

#[test]
fn negation_of_refuted_formula_is_consistent() {
    // an unsat formula's negation is consistent on the same prior state
    let mut ctx = Context::new();
    let x = real(&mut ctx, "x");
    ctx.process(Formula::ge(x.clone(), c(5)));
    let mark = ctx.save();

    let phi = Formula::le(x.clone(), c(2));
    assert!(ctx.process(phi.clone()).is_unsat());

    ctx.restore(mark).unwrap();
    assert!(!ctx.process(phi.negate()).is_unsat());
}

#[test]
fn resolve_decides_disjunctions() {
    let mut ctx = Context::new();
    let x = int(&mut ctx, "x");
    ctx.process(Formula::ge(x.clone(), c(0)));
    ctx.process(Formula::le(x.clone(), c(1)));

    let split = Formula::Or(vec![
        Formula::eq(x.clone(), c(0)),
        Formula::eq(x.clone(), c(1)),
    ]);
    assert_eq!(ctx.process(split), Status::Unknown);
    assert!(ctx.resolve().is_sat());

    // excluding both leaves nothing
    let mut ctx2 = Context::new();
    let x2 = int(&mut ctx2, "x");
    ctx2.process(Formula::ge(x2.clone(), c(0)));
    ctx2.process(Formula::le(x2.clone(), c(1)));
    ctx2.process(Formula::diseq(x2.clone(), c(0)));
    ctx2.process(Formula::diseq(x2.clone(), c(1)));
    assert!(ctx2.resolve().is_unsat());
}
