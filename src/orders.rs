//! Equality and ordering relations on [`Node`]s.
//!
//! [`SmtEq`] is available for every sort and uses Z3's generic equality.
//! [`SmtPartialOrd`] is available for sorts with an ordering (see
//! [`OrderedSort`]) and dispatches to the sort's comparison entry points. Both
//! always produce Boolean nodes and accept a node or a native literal on the
//! right, like the operators in [`crate::ops`].

use z3_sys::{Z3_ast, Z3_mk_distinct, Z3_mk_eq};

use crate::{
    context::Context,
    node::Node,
    ops::Coerce,
    sorts::{raw_args, Bool, OrderedSort, Sort},
};

/// The different ordering relations. It's like [`std::cmp::Ordering`], but with
/// more options to allow for more specialization.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum SmtOrdering {
    Less,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
}

impl SmtOrdering {
    /// Return the dual ordering relation.
    pub fn reverse(self) -> Self {
        match self {
            SmtOrdering::Less => SmtOrdering::Greater,
            SmtOrdering::LessOrEqual => SmtOrdering::GreaterOrEqual,
            SmtOrdering::Equal => SmtOrdering::Equal,
            SmtOrdering::GreaterOrEqual => SmtOrdering::LessOrEqual,
            SmtOrdering::Greater => SmtOrdering::Less,
        }
    }
}

unsafe fn mk_eq(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
    Z3_mk_eq(ctx.z3(), a, b)
}

unsafe fn mk_ne(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
    Z3_mk_distinct(ctx.z3(), 2, [a, b].as_ptr())
}

/// SMT values with an equality relation.
pub trait SmtEq<'ctx, S: Sort> {
    fn smt_eq(&self, other: impl Coerce<'ctx, S>) -> Node<'ctx, Bool>;

    fn smt_ne(&self, other: impl Coerce<'ctx, S>) -> Node<'ctx, Bool>;
}

impl<'ctx, S: Sort> SmtEq<'ctx, S> for Node<'ctx, S> {
    fn smt_eq(&self, other: impl Coerce<'ctx, S>) -> Node<'ctx, Bool> {
        let other = other.coerce(self);
        self.binary(&other, mk_eq)
    }

    /// Encoded as a two-element `distinct`.
    fn smt_ne(&self, other: impl Coerce<'ctx, S>) -> Node<'ctx, Bool> {
        let other = other.coerce(self);
        self.binary(&other, mk_ne)
    }
}

/// Partially ordered SMT values.
pub trait SmtPartialOrd<'ctx, S: Sort> {
    /// Encode the given relation between `self` and `other`.
    fn smt_cmp(&self, other: impl Coerce<'ctx, S>, ordering: SmtOrdering) -> Node<'ctx, Bool>;

    fn lt(&self, other: impl Coerce<'ctx, S>) -> Node<'ctx, Bool> {
        self.smt_cmp(other, SmtOrdering::Less)
    }

    /// Shortcut for `self.smt_cmp(other, SmtOrdering::LessOrEqual)`.
    fn le(&self, other: impl Coerce<'ctx, S>) -> Node<'ctx, Bool> {
        self.smt_cmp(other, SmtOrdering::LessOrEqual)
    }

    fn gt(&self, other: impl Coerce<'ctx, S>) -> Node<'ctx, Bool> {
        self.smt_cmp(other, SmtOrdering::Greater)
    }

    fn ge(&self, other: impl Coerce<'ctx, S>) -> Node<'ctx, Bool> {
        self.smt_cmp(other, SmtOrdering::GreaterOrEqual)
    }
}

impl<'ctx, S: OrderedSort> SmtPartialOrd<'ctx, S> for Node<'ctx, S> {
    fn smt_cmp(&self, other: impl Coerce<'ctx, S>, ordering: SmtOrdering) -> Node<'ctx, Bool> {
        let other = other.coerce(self);
        match ordering {
            SmtOrdering::Less => self.binary(&other, S::mk_lt),
            SmtOrdering::LessOrEqual => self.binary(&other, S::mk_le),
            SmtOrdering::Equal => self.binary(&other, mk_eq),
            SmtOrdering::GreaterOrEqual => self.binary(&other, S::mk_ge),
            SmtOrdering::Greater => self.binary(&other, S::mk_gt),
        }
    }
}

/// Return the minimum between two SMT values by encoding a conditional branch
/// on whether `a` is less than or equal to `b`.
pub fn smt_min<'ctx, S: OrderedSort>(a: &Node<'ctx, S>, b: &Node<'ctx, S>) -> Node<'ctx, S> {
    a.le(b).ite(a, b)
}

/// Return the maximum between two SMT values by encoding a conditional branch
/// on whether `a` is greater than or equal to `b`.
pub fn smt_max<'ctx, S: OrderedSort>(a: &Node<'ctx, S>, b: &Node<'ctx, S>) -> Node<'ctx, S> {
    a.ge(b).ite(a, b)
}

impl Context {
    /// Whether all `args` are pairwise different. Trivially `true` for fewer
    /// than two arguments.
    pub fn distinct<'ctx, S: Sort>(&'ctx self, args: &[Node<'ctx, S>]) -> Node<'ctx, Bool> {
        if args.len() < 2 {
            return self.bool_val(true);
        }
        let args = raw_args(self, args);
        self.wrap_ast(|z3| unsafe { Z3_mk_distinct(z3, args.len() as u32, args.as_ptr()) })
    }
}

#[cfg(test)]
mod test {
    use super::{smt_max, smt_min, SmtEq, SmtOrdering, SmtPartialOrd};
    use crate::{
        context::with_default_context,
        node::Ast,
        solver::{SatResult, Solver},
        sorts::SortKind,
    };

    #[test]
    fn test_reverse_is_involution() {
        let all = [
            SmtOrdering::Less,
            SmtOrdering::LessOrEqual,
            SmtOrdering::Equal,
            SmtOrdering::GreaterOrEqual,
            SmtOrdering::Greater,
        ];
        for ordering in all {
            assert_eq!(ordering.reverse().reverse(), ordering);
        }
        assert_eq!(SmtOrdering::Less.reverse(), SmtOrdering::Greater);
    }

    #[test]
    fn test_relations_are_boolean() {
        with_default_context(|ctx| {
            let x = ctx.int_const("x")?;
            let f = ctx.float_const("f")?;
            let b = ctx.bool_const("b")?;
            assert_eq!(x.smt_eq(3).to_string(), "(= x 3)");
            assert_eq!(x.smt_ne(3).to_string(), "(distinct x 3)");
            assert_eq!(x.le(&x).to_string(), "(<= x x)");
            assert_eq!(x.smt_cmp(1, SmtOrdering::Greater).to_string(), "(> x 1)");
            assert_eq!(b.smt_eq(false).sort_kind(), SortKind::Bool);
            assert_eq!(f.lt(0.5).sort_kind(), SortKind::Bool);
            assert!(f.ge(&f).to_string().starts_with("(fp.geq f"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_distinct() {
        with_default_context(|ctx| {
            let xs = vec![ctx.int_const("a")?, ctx.int_const("b")?, ctx.int_const("c")?];
            assert_eq!(ctx.distinct(&xs).to_string(), "(distinct a b c)");
            assert_eq!(ctx.distinct(&xs[..1]).to_string(), "true");

            // three pairwise different values in {0, 1} do not exist
            let mut solver = Solver::new(ctx)?;
            solver.assert(&ctx.distinct(&xs))?;
            for x in &xs {
                solver.assert(&x.ge(0))?;
                solver.assert(&x.le(1))?;
            }
            assert_eq!(solver.check()?, SatResult::Unsat);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_min_max() {
        with_default_context(|ctx| {
            let x = ctx.int_const("x")?;
            let y = ctx.int_const("y")?;
            let mut solver = Solver::new(ctx)?;
            let min = smt_min(&x, &y);
            let max = smt_max(&x, &y);
            solver.assert(&!(min.le(&x) & max.ge(&y)))?;
            assert_eq!(solver.check()?, SatResult::Unsat);
            Ok(())
        })
        .unwrap();
    }
}
