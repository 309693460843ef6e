//! Rust operators on [`Node`]s.
//!
//! Operators are implemented once per capability trait from
//! [`crate::sorts`], for owned and borrowed nodes on the left. The right-hand
//! side is anything that implements [`Coerce`] for the left node's sort: a
//! node (owned or borrowed) of the same sort, or a native literal. Literals on
//! the left work for `bool`, `i32`, `i64`, `u32`, `u64`, `f32` and `f64`.
//!
//! | operator | [`Bool`] | [`Int`] | [`BitVec`] | [`Float`] |
//! |----------|----------|---------|------------|-----------|
//! | `+ - *`  |          | n-ary add/sub/mul | `bvadd` ... | rounded (RNE) |
//! | `/`      |          | `div`   | `bvsdiv`   | rounded (RNE) |
//! | `%`      |          | `mod`   | `bvsrem`   |           |
//! | unary `-`|          | `-`     | `bvneg`    | `fp.neg`  |
//! | `& \| ^` | `and or xor` |     | `bvand bvor bvxor` |   |
//! | `!`      | `not`    |         | `bvnot`    |           |
//! | `<< >>`  |          |         | `bvshl bvashr` |       |

use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Rem, Shl, Shr, Sub};

use z3_sys::{
    Z3_ast, Z3_get_sort, Z3_mk_bvashr, Z3_mk_bvshl, Z3_mk_false, Z3_mk_fpa_numeral_double,
    Z3_mk_int64, Z3_mk_numeral, Z3_mk_true, Z3_mk_unsigned_int64,
};

use crate::{
    context::Context,
    error::SmtError,
    forward_binary_op,
    node::{Ast, Node},
    sorts::{ArithSort, BitVec, BitwiseSort, Bool, Float, Int, RemSort, Sort},
};

/// Conversion of an operand into a node of sort `S`, using a sibling node
/// `like` for everything the operand does not determine itself: the context,
/// and for bit-vector literals the width.
pub trait Coerce<'ctx, S: Sort> {
    fn coerce(self, like: &Node<'ctx, S>) -> Node<'ctx, S>;
}

impl<'ctx, S: Sort> Coerce<'ctx, S> for Node<'ctx, S> {
    fn coerce(self, _like: &Node<'ctx, S>) -> Node<'ctx, S> {
        self
    }
}

impl<'a, 'ctx, S: Sort> Coerce<'ctx, S> for &'a Node<'ctx, S> {
    fn coerce(self, _like: &Node<'ctx, S>) -> Node<'ctx, S> {
        self.clone()
    }
}

impl<'ctx> Coerce<'ctx, Bool> for bool {
    fn coerce(self, like: &Node<'ctx, Bool>) -> Node<'ctx, Bool> {
        like.get_ctx().wrap_ast(|z3| unsafe {
            if self {
                Z3_mk_true(z3)
            } else {
                Z3_mk_false(z3)
            }
        })
    }
}

/// Integer literals take the sort of the sibling: `Int`, or a bit-vector of
/// the sibling's width. Negative values wrap around for bit-vectors.
macro_rules! coerce_integer {
    ($($sort:ty),*) => { $(
        impl<'ctx> Coerce<'ctx, $sort> for i64 {
            fn coerce(self, like: &Node<'ctx, $sort>) -> Node<'ctx, $sort> {
                let sibling = like.get_z3_ast();
                like.get_ctx()
                    .wrap_ast(|z3| unsafe { Z3_mk_int64(z3, self, Z3_get_sort(z3, sibling)) })
            }
        }

        impl<'ctx> Coerce<'ctx, $sort> for i32 {
            fn coerce(self, like: &Node<'ctx, $sort>) -> Node<'ctx, $sort> {
                i64::from(self).coerce(like)
            }
        }

        impl<'ctx> Coerce<'ctx, $sort> for u64 {
            fn coerce(self, like: &Node<'ctx, $sort>) -> Node<'ctx, $sort> {
                let sibling = like.get_z3_ast();
                like.get_ctx().wrap_ast(|z3| unsafe {
                    Z3_mk_unsigned_int64(z3, self, Z3_get_sort(z3, sibling))
                })
            }
        }

        impl<'ctx> Coerce<'ctx, $sort> for u32 {
            fn coerce(self, like: &Node<'ctx, $sort>) -> Node<'ctx, $sort> {
                u64::from(self).coerce(like)
            }
        }

        /// Decimal numerals of arbitrary size. Z3 rejects malformed strings
        /// through its error handler.
        impl<'a, 'ctx> Coerce<'ctx, $sort> for &'a str {
            fn coerce(self, like: &Node<'ctx, $sort>) -> Node<'ctx, $sort> {
                let ctx = like.get_ctx();
                let numeral = match std::ffi::CString::new(self) {
                    Ok(numeral) => numeral,
                    Err(_) => {
                        ctx.poison_with(SmtError::InvalidName(self.to_owned()));
                        return Node::null(ctx);
                    }
                };
                let sibling = like.get_z3_ast();
                ctx.wrap_ast(|z3| unsafe {
                    Z3_mk_numeral(z3, numeral.as_ptr(), Z3_get_sort(z3, sibling))
                })
            }
        }
    )* };
}

coerce_integer!(Int, BitVec);

impl<'ctx> Coerce<'ctx, Float> for f64 {
    fn coerce(self, like: &Node<'ctx, Float>) -> Node<'ctx, Float> {
        let sibling = like.get_z3_ast();
        like.get_ctx().wrap_ast(|z3| unsafe {
            Z3_mk_fpa_numeral_double(z3, self, Z3_get_sort(z3, sibling))
        })
    }
}

impl<'ctx> Coerce<'ctx, Float> for f32 {
    fn coerce(self, like: &Node<'ctx, Float>) -> Node<'ctx, Float> {
        f64::from(self).coerce(like)
    }
}

/// Implement a binary operator on `&Node<S>` for all sorts `S` with the
/// capability `$bound`, dispatching to `$bound::$mk`, and forward the owned
/// version to it.
macro_rules! binary_op {
    ($bound:ident, $op_trait:ident, $op_fn:ident, $mk:ident) => {
        impl<'a, 'ctx, S, R> $op_trait<R> for &'a Node<'ctx, S>
        where
            S: $bound,
            R: Coerce<'ctx, S>,
        {
            type Output = Node<'ctx, S>;

            fn $op_fn(self, rhs: R) -> Self::Output {
                let rhs = rhs.coerce(self);
                self.binary(&rhs, S::$mk)
            }
        }

        forward_binary_op!($bound, $op_trait, $op_fn);
    };
}

binary_op!(ArithSort, Add, add, mk_add);
binary_op!(ArithSort, Sub, sub, mk_sub);
binary_op!(ArithSort, Mul, mul, mk_mul);
binary_op!(ArithSort, Div, div, mk_div);
binary_op!(RemSort, Rem, rem, mk_rem);
binary_op!(BitwiseSort, BitAnd, bitand, mk_and);
binary_op!(BitwiseSort, BitOr, bitor, mk_or);
binary_op!(BitwiseSort, BitXor, bitxor, mk_xor);

macro_rules! unary_op {
    ($bound:ident, $op_trait:ident, $op_fn:ident, $mk:ident) => {
        impl<'a, 'ctx, S: $bound> $op_trait for &'a Node<'ctx, S> {
            type Output = Node<'ctx, S>;

            fn $op_fn(self) -> Self::Output {
                self.unary(S::$mk)
            }
        }

        impl<'ctx, S: $bound> $op_trait for Node<'ctx, S> {
            type Output = Node<'ctx, S>;

            fn $op_fn(self) -> Self::Output {
                self.unary(S::$mk)
            }
        }
    };
}

unary_op!(ArithSort, Neg, neg, mk_neg);
unary_op!(BitwiseSort, Not, not, mk_not);

unsafe fn mk_shl(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
    Z3_mk_bvshl(ctx.z3(), a, b)
}

unsafe fn mk_ashr(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
    Z3_mk_bvashr(ctx.z3(), a, b)
}

impl<'a, 'ctx, R: Coerce<'ctx, BitVec>> Shl<R> for &'a Node<'ctx, BitVec> {
    type Output = Node<'ctx, BitVec>;

    fn shl(self, rhs: R) -> Self::Output {
        let rhs = rhs.coerce(self);
        self.binary(&rhs, mk_shl)
    }
}

impl<'ctx, R: Coerce<'ctx, BitVec>> Shl<R> for Node<'ctx, BitVec> {
    type Output = Node<'ctx, BitVec>;

    fn shl(self, rhs: R) -> Self::Output {
        (&self).shl(rhs)
    }
}

/// Arithmetic shift right. See [`Node::lshr`] for the logical shift.
impl<'a, 'ctx, R: Coerce<'ctx, BitVec>> Shr<R> for &'a Node<'ctx, BitVec> {
    type Output = Node<'ctx, BitVec>;

    fn shr(self, rhs: R) -> Self::Output {
        let rhs = rhs.coerce(self);
        self.binary(&rhs, mk_ashr)
    }
}

impl<'ctx, R: Coerce<'ctx, BitVec>> Shr<R> for Node<'ctx, BitVec> {
    type Output = Node<'ctx, BitVec>;

    fn shr(self, rhs: R) -> Self::Output {
        (&self).shr(rhs)
    }
}

/// Implement operators with a native literal as the left operand. The literal
/// is coerced using the right operand's sort.
macro_rules! literal_lhs_ops {
    ($lit:ty => $sort:ty: $($op_trait:ident $op_fn:ident),*) => { $(
        impl<'ctx> $op_trait<Node<'ctx, $sort>> for $lit {
            type Output = Node<'ctx, $sort>;

            fn $op_fn(self, rhs: Node<'ctx, $sort>) -> Self::Output {
                self.coerce(&rhs).$op_fn(rhs)
            }
        }

        impl<'a, 'ctx> $op_trait<&'a Node<'ctx, $sort>> for $lit {
            type Output = Node<'ctx, $sort>;

            fn $op_fn(self, rhs: &'a Node<'ctx, $sort>) -> Self::Output {
                self.coerce(rhs).$op_fn(rhs)
            }
        }
    )* };
}

literal_lhs_ops!(bool => Bool: BitAnd bitand, BitOr bitor, BitXor bitxor);
literal_lhs_ops!(i64 => Int: Add add, Sub sub, Mul mul, Div div, Rem rem);
literal_lhs_ops!(i32 => Int: Add add, Sub sub, Mul mul, Div div, Rem rem);
literal_lhs_ops!(u64 => Int: Add add, Sub sub, Mul mul, Div div, Rem rem);
literal_lhs_ops!(u32 => Int: Add add, Sub sub, Mul mul, Div div, Rem rem);
literal_lhs_ops!(i64 => BitVec: Add add, Sub sub, Mul mul, Div div, Rem rem, BitAnd bitand, BitOr bitor, BitXor bitxor);
literal_lhs_ops!(i32 => BitVec: Add add, Sub sub, Mul mul, Div div, Rem rem, BitAnd bitand, BitOr bitor, BitXor bitxor);
literal_lhs_ops!(u64 => BitVec: Add add, Sub sub, Mul mul, Div div, Rem rem, BitAnd bitand, BitOr bitor, BitXor bitxor);
literal_lhs_ops!(u32 => BitVec: Add add, Sub sub, Mul mul, Div div, Rem rem, BitAnd bitand, BitOr bitor, BitXor bitxor);
literal_lhs_ops!(f64 => Float: Add add, Sub sub, Mul mul, Div div);
literal_lhs_ops!(f32 => Float: Add add, Sub sub, Mul mul, Div div);
