//! Type-level sort tags for [`crate::Node`].
//!
//! Each Z3 sort family we support has an uninhabited marker type implementing
//! the sealed [`Sort`] trait. The capability traits below ([`ArithSort`],
//! [`RemSort`], [`BitwiseSort`], [`OrderedSort`]) select which operators a
//! sort supports and map each operator to exactly one Z3 entry point. The
//! generic operator implementations in [`crate::ops`] dispatch through them.

use std::fmt::{self, Display, Formatter};

use z3_sys::{Z3_ast, Z3_context, Z3_mk_const, Z3_mk_string_symbol, Z3_sort};

use crate::{
    context::Context,
    error::{SmtError, SmtResult},
    node::Node,
    util::symbol_name,
};

mod bitvec;
mod boolean;
mod float;
mod int;

pub use bitvec::BitVec;
pub use boolean::Bool;
pub use float::Float;
pub use int::Int;

mod private {
    pub trait Sealed {}
}

pub(crate) use boolean::raw_args;
pub(crate) use private::Sealed;

/// Runtime name of a sort family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKind {
    Bool,
    Int,
    BitVec,
    Float,
}

impl Display for SortKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SortKind::Bool => f.write_str("Bool"),
            SortKind::Int => f.write_str("Int"),
            SortKind::BitVec => f.write_str("BitVec"),
            SortKind::Float => f.write_str("Float64"),
        }
    }
}

/// A sort tag. Implemented only by the markers in this module.
pub trait Sort: Sealed + 'static {
    const KIND: SortKind;
}

/// A Z3 entry point taking one term.
pub type UnaryFn = unsafe fn(&Context, Z3_ast) -> Z3_ast;

/// A Z3 entry point taking two terms.
pub type BinaryFn = unsafe fn(&Context, Z3_ast, Z3_ast) -> Z3_ast;

/// Sorts with `+`, `-`, `*`, `/` and unary `-`.
///
/// The functions are called with live, non-null terms of this sort.
pub trait ArithSort: Sort {
    #[doc(hidden)]
    unsafe fn mk_add(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
    #[doc(hidden)]
    unsafe fn mk_sub(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
    #[doc(hidden)]
    unsafe fn mk_mul(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
    #[doc(hidden)]
    unsafe fn mk_div(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
    #[doc(hidden)]
    unsafe fn mk_neg(ctx: &Context, a: Z3_ast) -> Z3_ast;
}

/// Sorts with `%`.
pub trait RemSort: Sort {
    #[doc(hidden)]
    unsafe fn mk_rem(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
}

/// Sorts with `&`, `|`, `^` and `!`. Logical for [`Bool`], bitwise for
/// [`BitVec`].
pub trait BitwiseSort: Sort {
    #[doc(hidden)]
    unsafe fn mk_and(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
    #[doc(hidden)]
    unsafe fn mk_or(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
    #[doc(hidden)]
    unsafe fn mk_xor(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
    #[doc(hidden)]
    unsafe fn mk_not(ctx: &Context, a: Z3_ast) -> Z3_ast;
}

/// Sorts with an ordering. For [`BitVec`], the ordering is the signed one.
pub trait OrderedSort: Sort {
    #[doc(hidden)]
    unsafe fn mk_lt(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
    #[doc(hidden)]
    unsafe fn mk_le(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
    #[doc(hidden)]
    unsafe fn mk_gt(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
    #[doc(hidden)]
    unsafe fn mk_ge(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast;
}

/// Sorts whose values can be extracted as integers from a model.
pub trait IntegerSort: Sort {}

impl IntegerSort for Int {}
impl IntegerSort for BitVec {}

/// Sorts that an [`crate::Optimizer`] can minimize or maximize.
pub trait OptimizeSort: Sort {}

impl OptimizeSort for Int {}
impl OptimizeSort for BitVec {}

impl Context {
    /// Create a constant named `name` whose sort is built by `sort`.
    pub(crate) fn named_const<S: Sort>(
        &self,
        name: &str,
        sort: impl FnOnce(Z3_context) -> Z3_sort,
    ) -> SmtResult<Node<'_, S>> {
        let name = symbol_name(name)?;
        let node = self.wrap_ast(|z3| unsafe {
            let symbol = Z3_mk_string_symbol(z3, name.as_ptr());
            Z3_mk_const(z3, symbol, sort(z3))
        });
        self.status()?;
        Ok(node)
    }
}

/// Bit-vector widths must be positive.
pub(crate) fn check_width(width: u32) -> SmtResult<u32> {
    if width == 0 {
        Err(SmtError::InvalidWidth(width))
    } else {
        Ok(width)
    }
}
