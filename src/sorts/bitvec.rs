use z3_sys::{
    Z3_ast, Z3_get_bv_sort_size, Z3_mk_bv_sort, Z3_mk_bvadd, Z3_mk_bvand, Z3_mk_bvlshr,
    Z3_mk_bvmul, Z3_mk_bvneg, Z3_mk_bvnot, Z3_mk_bvor, Z3_mk_bvsdiv, Z3_mk_bvsge,
    Z3_mk_bvsgt, Z3_mk_bvsle, Z3_mk_bvslt, Z3_mk_bvsmod, Z3_mk_bvsrem, Z3_mk_bvsub,
    Z3_mk_bvudiv, Z3_mk_bvuge, Z3_mk_bvugt, Z3_mk_bvule, Z3_mk_bvult, Z3_mk_bvurem,
    Z3_mk_bvxor, Z3_mk_concat, Z3_mk_extract, Z3_mk_sign_ext, Z3_mk_unsigned_int64,
    Z3_mk_zero_ext,
};

use super::{check_width, ArithSort, BitwiseSort, OrderedSort, RemSort, Sealed, Sort, SortKind};
use crate::{
    context::Context,
    error::SmtResult,
    node::{Ast, Node},
    ops::Coerce,
};

/// Fixed-width bit-vectors. The width is not part of the type; mixing
/// widths is reported by Z3.
///
/// Arithmetic, division and comparison operators are signed. The unsigned
/// variants are methods on [`Node`].
#[derive(Debug)]
pub enum BitVec {}

impl Sealed for BitVec {}

impl Sort for BitVec {
    const KIND: SortKind = SortKind::BitVec;
}

impl ArithSort for BitVec {
    unsafe fn mk_add(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvadd(ctx.z3(), a, b)
    }

    unsafe fn mk_sub(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvsub(ctx.z3(), a, b)
    }

    unsafe fn mk_mul(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvmul(ctx.z3(), a, b)
    }

    unsafe fn mk_div(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvsdiv(ctx.z3(), a, b)
    }

    unsafe fn mk_neg(ctx: &Context, a: Z3_ast) -> Z3_ast {
        Z3_mk_bvneg(ctx.z3(), a)
    }
}

/// Signed remainder; the sign follows the dividend.
impl RemSort for BitVec {
    unsafe fn mk_rem(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvsrem(ctx.z3(), a, b)
    }
}

impl BitwiseSort for BitVec {
    unsafe fn mk_and(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvand(ctx.z3(), a, b)
    }

    unsafe fn mk_or(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvor(ctx.z3(), a, b)
    }

    unsafe fn mk_xor(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvxor(ctx.z3(), a, b)
    }

    unsafe fn mk_not(ctx: &Context, a: Z3_ast) -> Z3_ast {
        Z3_mk_bvnot(ctx.z3(), a)
    }
}

impl OrderedSort for BitVec {
    unsafe fn mk_lt(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvslt(ctx.z3(), a, b)
    }

    unsafe fn mk_le(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvsle(ctx.z3(), a, b)
    }

    unsafe fn mk_gt(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvsgt(ctx.z3(), a, b)
    }

    unsafe fn mk_ge(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_bvsge(ctx.z3(), a, b)
    }
}

impl Context {
    /// A new bit-vector constant named `name` with `width` bits.
    pub fn bv_const(&self, name: &str, width: u32) -> SmtResult<Node<'_, BitVec>> {
        let width = check_width(width)?;
        self.named_const(name, |z3| unsafe { Z3_mk_bv_sort(z3, width) })
    }

    /// A bit-vector literal. Bits of `value` above `width` are dropped.
    pub fn bv_val(&self, value: u64, width: u32) -> SmtResult<Node<'_, BitVec>> {
        let width = check_width(width)?;
        let node = self.wrap_ast(|z3| unsafe {
            Z3_mk_unsigned_int64(z3, value, Z3_mk_bv_sort(z3, width))
        });
        self.status()?;
        Ok(node)
    }
}

macro_rules! bv_binary_methods {
    ($($(#[$doc:meta])* $name:ident => $z3_fn:ident -> $out:ty;)*) => { $(
        $(#[$doc])*
        pub fn $name(&self, rhs: impl Coerce<'ctx, BitVec>) -> Node<'ctx, $out> {
            let rhs = rhs.coerce(self);
            self.get_ctx().claim(rhs.get_ctx());
            let (a, b) = (self.get_z3_ast(), rhs.get_z3_ast());
            self.get_ctx().wrap_ast(|z3| unsafe { $z3_fn(z3, a, b) })
        }
    )* };
}

impl<'ctx> Node<'ctx, BitVec> {
    /// The number of bits. Zero for a null node.
    pub fn width(&self) -> u32 {
        if self.is_null() {
            return 0;
        }
        unsafe { Z3_get_bv_sort_size(self.get_ctx().z3(), self.z3_sort()) }
    }

    bv_binary_methods! {
        /// Unsigned division.
        udiv => Z3_mk_bvudiv -> BitVec;
        /// Unsigned remainder.
        urem => Z3_mk_bvurem -> BitVec;
        /// Signed modulus; the sign follows the divisor.
        smod => Z3_mk_bvsmod -> BitVec;
        /// Logical shift right.
        lshr => Z3_mk_bvlshr -> BitVec;
        /// `self` in the high bits, `rhs` in the low bits. For a literal
        /// `rhs`, the literal gets the width of `self`.
        concat => Z3_mk_concat -> BitVec;
        ult => Z3_mk_bvult -> super::Bool;
        ule => Z3_mk_bvule -> super::Bool;
        ugt => Z3_mk_bvugt -> super::Bool;
        uge => Z3_mk_bvuge -> super::Bool;
    }

    /// Bits `high` down to `low`, both inclusive.
    pub fn extract(&self, high: u32, low: u32) -> Node<'ctx, BitVec> {
        let a = self.get_z3_ast();
        self.get_ctx()
            .wrap_ast(|z3| unsafe { Z3_mk_extract(z3, high, low, a) })
    }

    /// Extend with `extra` zero bits.
    pub fn zero_ext(&self, extra: u32) -> Node<'ctx, BitVec> {
        let a = self.get_z3_ast();
        self.get_ctx()
            .wrap_ast(|z3| unsafe { Z3_mk_zero_ext(z3, extra, a) })
    }

    /// Extend with `extra` copies of the sign bit.
    pub fn sign_ext(&self, extra: u32) -> Node<'ctx, BitVec> {
        let a = self.get_z3_ast();
        self.get_ctx()
            .wrap_ast(|z3| unsafe { Z3_mk_sign_ext(z3, extra, a) })
    }
}

#[cfg(test)]
mod test {
    use crate::{
        context::with_default_context,
        error::SmtError,
        orders::{SmtEq, SmtPartialOrd},
        solver::{SatResult, Solver},
    };

    #[test]
    fn test_width_changes() {
        with_default_context(|ctx| {
            let x = ctx.bv_const("x", 8)?;
            let y = ctx.bv_const("y", 4)?;
            assert_eq!(x.concat(&y).width(), 12);
            assert_eq!(x.concat(1).width(), 16);
            assert_eq!(x.extract(7, 4).width(), 4);
            assert_eq!(y.zero_ext(4).width(), 8);
            assert_eq!(y.sign_ext(12).width(), 16);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_comparisons_are_boolean() {
        with_default_context(|ctx| {
            let x = ctx.bv_const("x", 8)?;
            assert_eq!(x.lt(0).to_string(), "(bvslt x #x00)");
            assert_eq!(x.ult(0).to_string(), "(bvult x #x00)");
            assert_eq!(x.uge(&x).to_string(), "(bvuge x x)");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_signed_and_unsigned_differ() {
        with_default_context(|ctx| {
            let x = ctx.bv_const("x", 8)?;
            let mut solver = Solver::new(ctx)?;
            // 0xff is -1 when signed but 255 when unsigned
            solver.assert(&x.smt_eq(0xffu64))?;
            solver.assert(&x.lt(0))?;
            solver.assert(&x.ugt(0))?;
            assert_eq!(solver.check()?, SatResult::Sat);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_overflow_wraps() {
        with_default_context(|ctx| {
            let x = ctx.bv_const("x", 8)?;
            let mut solver = Solver::new(ctx)?;
            solver.assert(&(&x + 1).smt_eq(0))?;
            solver.check_model(|model| {
                assert_eq!(model.eval_int(&x)?, 255);
                Ok(())
            })
        })
        .unwrap();
    }

    #[test]
    fn test_zero_width() {
        with_default_context(|ctx| {
            assert!(matches!(ctx.bv_const("x", 0), Err(SmtError::InvalidWidth(0))));
            assert!(matches!(ctx.bv_val(1, 0), Err(SmtError::InvalidWidth(0))));
            assert_eq!(ctx.bv_val(0x1ff, 8)?.to_string(), "#xff");
            Ok(())
        })
        .unwrap();
    }
}
