use z3_sys::{
    Z3_ast, Z3_mk_fpa_abs, Z3_mk_fpa_add, Z3_mk_fpa_div, Z3_mk_fpa_eq, Z3_mk_fpa_geq,
    Z3_mk_fpa_gt, Z3_mk_fpa_is_infinite, Z3_mk_fpa_is_nan, Z3_mk_fpa_is_negative,
    Z3_mk_fpa_is_zero, Z3_mk_fpa_leq, Z3_mk_fpa_lt, Z3_mk_fpa_mul, Z3_mk_fpa_neg,
    Z3_mk_fpa_numeral_double, Z3_mk_fpa_sort_double, Z3_mk_fpa_sqrt, Z3_mk_fpa_sub,
};

use super::{ArithSort, Bool, OrderedSort, Sealed, Sort, SortKind};
use crate::{
    context::Context,
    error::SmtResult,
    node::{Ast, Node},
    ops::Coerce,
};

/// IEEE 754 double precision floating-point numbers.
///
/// Rounding operations use the context's round-nearest-ties-to-even mode.
/// [`crate::orders::SmtEq::smt_eq`] is Z3's structural equality, under which
/// `NaN == NaN` and `+0 != -0`; use [`Node::fp_eq`] for IEEE equality.
#[derive(Debug)]
pub enum Float {}

impl Sealed for Float {}

impl Sort for Float {
    const KIND: SortKind = SortKind::Float;
}

impl ArithSort for Float {
    unsafe fn mk_add(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_fpa_add(ctx.z3(), ctx.rounding_mode(), a, b)
    }

    unsafe fn mk_sub(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_fpa_sub(ctx.z3(), ctx.rounding_mode(), a, b)
    }

    unsafe fn mk_mul(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_fpa_mul(ctx.z3(), ctx.rounding_mode(), a, b)
    }

    unsafe fn mk_div(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_fpa_div(ctx.z3(), ctx.rounding_mode(), a, b)
    }

    unsafe fn mk_neg(ctx: &Context, a: Z3_ast) -> Z3_ast {
        Z3_mk_fpa_neg(ctx.z3(), a)
    }
}

impl OrderedSort for Float {
    unsafe fn mk_lt(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_fpa_lt(ctx.z3(), a, b)
    }

    unsafe fn mk_le(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_fpa_leq(ctx.z3(), a, b)
    }

    unsafe fn mk_gt(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_fpa_gt(ctx.z3(), a, b)
    }

    unsafe fn mk_ge(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_fpa_geq(ctx.z3(), a, b)
    }
}

impl Context {
    /// A new double precision constant named `name`.
    pub fn float_const(&self, name: &str) -> SmtResult<Node<'_, Float>> {
        self.named_const(name, |z3| unsafe { Z3_mk_fpa_sort_double(z3) })
    }

    pub fn float_val(&self, value: f64) -> Node<'_, Float> {
        self.wrap_ast(|z3| unsafe {
            Z3_mk_fpa_numeral_double(z3, value, Z3_mk_fpa_sort_double(z3))
        })
    }
}

unsafe fn mk_abs(ctx: &Context, a: Z3_ast) -> Z3_ast {
    Z3_mk_fpa_abs(ctx.z3(), a)
}

unsafe fn mk_sqrt(ctx: &Context, a: Z3_ast) -> Z3_ast {
    Z3_mk_fpa_sqrt(ctx.z3(), ctx.rounding_mode(), a)
}

unsafe fn mk_is_nan(ctx: &Context, a: Z3_ast) -> Z3_ast {
    Z3_mk_fpa_is_nan(ctx.z3(), a)
}

unsafe fn mk_is_infinite(ctx: &Context, a: Z3_ast) -> Z3_ast {
    Z3_mk_fpa_is_infinite(ctx.z3(), a)
}

unsafe fn mk_is_negative(ctx: &Context, a: Z3_ast) -> Z3_ast {
    Z3_mk_fpa_is_negative(ctx.z3(), a)
}

unsafe fn mk_is_zero(ctx: &Context, a: Z3_ast) -> Z3_ast {
    Z3_mk_fpa_is_zero(ctx.z3(), a)
}

unsafe fn mk_fp_eq(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
    Z3_mk_fpa_eq(ctx.z3(), a, b)
}

impl<'ctx> Node<'ctx, Float> {
    pub fn abs(&self) -> Node<'ctx, Float> {
        self.unary(mk_abs)
    }

    pub fn sqrt(&self) -> Node<'ctx, Float> {
        self.unary(mk_sqrt)
    }

    pub fn is_nan(&self) -> Node<'ctx, Bool> {
        self.unary(mk_is_nan)
    }

    pub fn is_infinite(&self) -> Node<'ctx, Bool> {
        self.unary(mk_is_infinite)
    }

    pub fn is_zero(&self) -> Node<'ctx, Bool> {
        self.unary(mk_is_zero)
    }

    /// Whether the sign bit is set. False for NaN.
    pub fn is_negative(&self) -> Node<'ctx, Bool> {
        self.unary(mk_is_negative)
    }

    /// IEEE 754 equality.
    pub fn fp_eq(&self, rhs: impl Coerce<'ctx, Float>) -> Node<'ctx, Bool> {
        let rhs = rhs.coerce(self);
        self.binary(&rhs, mk_fp_eq)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        context::with_default_context,
        orders::{SmtEq, SmtPartialOrd},
        solver::{SatResult, Solver},
    };

    #[test]
    fn test_sqrt_of_square() {
        with_default_context(|ctx| {
            let f = ctx.float_const("f")?;
            let mut solver = Solver::new(ctx)?;
            solver.assert(&f.smt_eq(-3.0))?;
            solver.assert(&!(&f * &f).sqrt().smt_eq(f.abs()))?;
            assert_eq!(solver.check()?, SatResult::Unsat);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_nan_semantics() {
        with_default_context(|ctx| {
            let nan = ctx.float_val(f64::NAN);
            assert_eq!(nan.is_nan().simplify().to_string(), "true");
            assert_eq!(nan.smt_eq(&nan).simplify().to_string(), "true");
            assert_eq!(nan.fp_eq(&nan).simplify().to_string(), "false");
            assert_eq!(nan.lt(1.0).simplify().to_string(), "false");
            let inf = ctx.float_val(f64::INFINITY);
            assert_eq!(inf.is_infinite().simplify().to_string(), "true");
            let neg_zero = ctx.float_val(-0.0);
            assert_eq!(neg_zero.is_zero().simplify().to_string(), "true");
            assert_eq!(neg_zero.is_negative().simplify().to_string(), "true");
            Ok(())
        })
        .unwrap();
    }
}
