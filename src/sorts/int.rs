use z3_sys::{
    Z3_ast, Z3_mk_add, Z3_mk_div, Z3_mk_ge, Z3_mk_gt, Z3_mk_int64, Z3_mk_int_sort, Z3_mk_le,
    Z3_mk_lt, Z3_mk_mod, Z3_mk_mul, Z3_mk_numeral, Z3_mk_sub, Z3_mk_unary_minus,
};

use super::{raw_args, ArithSort, OrderedSort, RemSort, Sealed, Sort, SortKind};
use crate::{
    context::Context,
    error::{SmtError, SmtResult},
    node::Node,
    orders::SmtPartialOrd,
};

/// Mathematical integers.
#[derive(Debug)]
pub enum Int {}

impl Sealed for Int {}

impl Sort for Int {
    const KIND: SortKind = SortKind::Int;
}

/// Z3's integer addition, subtraction and multiplication are n-ary. Two
/// operands are packed into an array.
impl ArithSort for Int {
    unsafe fn mk_add(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_add(ctx.z3(), 2, [a, b].as_ptr())
    }

    unsafe fn mk_sub(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_sub(ctx.z3(), 2, [a, b].as_ptr())
    }

    unsafe fn mk_mul(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_mul(ctx.z3(), 2, [a, b].as_ptr())
    }

    unsafe fn mk_div(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_div(ctx.z3(), a, b)
    }

    unsafe fn mk_neg(ctx: &Context, a: Z3_ast) -> Z3_ast {
        Z3_mk_unary_minus(ctx.z3(), a)
    }
}

/// SMT-LIB `mod`, which is never negative.
impl RemSort for Int {
    unsafe fn mk_rem(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_mod(ctx.z3(), a, b)
    }
}

impl OrderedSort for Int {
    unsafe fn mk_lt(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_lt(ctx.z3(), a, b)
    }

    unsafe fn mk_le(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_le(ctx.z3(), a, b)
    }

    unsafe fn mk_gt(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_gt(ctx.z3(), a, b)
    }

    unsafe fn mk_ge(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_ge(ctx.z3(), a, b)
    }
}

impl Context {
    /// A new integer constant named `name`.
    pub fn int_const(&self, name: &str) -> SmtResult<Node<'_, Int>> {
        self.named_const(name, |z3| unsafe { Z3_mk_int_sort(z3) })
    }

    pub fn int_val(&self, value: i64) -> Node<'_, Int> {
        self.wrap_ast(|z3| unsafe { Z3_mk_int64(z3, value, Z3_mk_int_sort(z3)) })
    }

    /// An integer literal from a decimal string of any size.
    pub fn int_numeral(&self, numeral: &str) -> SmtResult<Node<'_, Int>> {
        let c_numeral = std::ffi::CString::new(numeral)
            .map_err(|_| SmtError::InvalidName(numeral.to_owned()))?;
        let node = self.wrap_ast(|z3| unsafe {
            Z3_mk_numeral(z3, c_numeral.as_ptr(), Z3_mk_int_sort(z3))
        });
        self.status()?;
        Ok(node)
    }

    /// Sum of all `args`. The empty sum is `0`.
    pub fn add<'ctx>(&'ctx self, args: &[Node<'ctx, Int>]) -> Node<'ctx, Int> {
        if args.is_empty() {
            return self.int_val(0);
        }
        let args = raw_args(self, args);
        self.wrap_ast(|z3| unsafe { Z3_mk_add(z3, args.len() as u32, args.as_ptr()) })
    }

    /// Product of all `args`. The empty product is `1`.
    pub fn mul<'ctx>(&'ctx self, args: &[Node<'ctx, Int>]) -> Node<'ctx, Int> {
        if args.is_empty() {
            return self.int_val(1);
        }
        let args = raw_args(self, args);
        self.wrap_ast(|z3| unsafe { Z3_mk_mul(z3, args.len() as u32, args.as_ptr()) })
    }
}

impl<'ctx> Node<'ctx, Int> {
    /// Absolute value, encoded as `ite(x >= 0, x, -x)`.
    pub fn abs(&self) -> Node<'ctx, Int> {
        self.ge(0).ite(self, -self)
    }
}
