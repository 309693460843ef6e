//! Utilities for tests that let Z3 prove properties of the operators. Also
//! contains those tests that compare operators against Rust's own arithmetic.

use proptest::prelude::*;

use crate::{
    context::{with_default_context, Context},
    error::SmtResult,
    node::Node,
    orders::{SmtEq, SmtPartialOrd},
    solver::{SatResult, Solver},
    sorts::Bool,
};

/// Create a new context and solver and check that the formula returned by `f`
/// is valid, i.e. that its negation is unsatisfiable. Panics with the
/// counter-example otherwise.
pub fn test_prove(f: impl for<'ctx> FnOnce(&'ctx Context) -> SmtResult<Node<'ctx, Bool>>) {
    with_default_context(|ctx| {
        let theorem = f(ctx)?;
        let mut solver = Solver::new(ctx)?;
        solver.assert(&!&theorem)?;
        match solver.check()? {
            SatResult::Unsat => {}
            SatResult::Sat => panic!(
                "counter-example: {}\nassertions:\n{}",
                solver.get_model()?,
                solver
            ),
            SatResult::Unknown => {
                panic!("solver returned unknown ({})", solver.get_reason_unknown()?)
            }
        }
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_prove_distributivity() {
    test_prove(|ctx| {
        let x = ctx.int_const("x")?;
        let y = ctx.int_const("y")?;
        let z = ctx.int_const("z")?;
        Ok((&x * (&y + &z)).smt_eq(&x * &y + &x * &z))
    });
}

#[test]
fn test_prove_bitvec_identities() {
    test_prove(|ctx| {
        let x = ctx.bv_const("x", 16)?;
        let y = ctx.bv_const("y", 16)?;
        Ok(smt_and!(
            (&x ^ &y ^ &y).smt_eq(&x),
            (&x + &y - &y).smt_eq(&x),
            (!&x + 1).smt_eq(-&x),
            (&x << 1).smt_eq(&x * 2)
        ))
    });
}

#[test]
#[should_panic(expected = "counter-example")]
fn test_prove_reports_counterexample() {
    test_prove(|ctx| {
        let x = ctx.int_const("x")?;
        Ok(x.gt(0))
    });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_int_division_is_euclidean(a in -1000i64..1000, b in -50i64..50) {
        prop_assume!(b != 0);
        test_prove(|ctx| {
            let a_node = ctx.int_val(a);
            Ok((&a_node / b).smt_eq(a.div_euclid(b)) & (&a_node % b).smt_eq(a.rem_euclid(b)))
        });
    }

    #[test]
    fn test_bitvec_matches_i8(a in any::<i8>(), b in any::<i8>(), shift in 0u32..8) {
        prop_assume!(b != 0 && !(a == i8::MIN && b == -1));
        test_prove(|ctx| {
            let a_node = ctx.bv_val(a as u8 as u64, 8)?;
            let b_node = ctx.bv_val(b as u8 as u64, 8)?;
            let as_bv = |value: i8| value as u8 as u64;
            Ok(smt_and!(
                (&a_node + &b_node).smt_eq(as_bv(a.wrapping_add(b))),
                (&a_node * &b_node).smt_eq(as_bv(a.wrapping_mul(b))),
                (&a_node / &b_node).smt_eq(as_bv(a / b)),
                (&a_node % &b_node).smt_eq(as_bv(a % b)),
                (&a_node >> shift).smt_eq(as_bv(a >> shift)),
                (&a_node << shift).smt_eq(as_bv(a.wrapping_shl(shift))),
                a_node.lt(&b_node).iff(a < b)
            ))
        });
    }
}
