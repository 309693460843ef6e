use z3_sys::{
    Z3_ast, Z3_mk_and, Z3_mk_bool_sort, Z3_mk_false, Z3_mk_iff, Z3_mk_implies, Z3_mk_ite,
    Z3_mk_not, Z3_mk_or, Z3_mk_true, Z3_mk_xor,
};

use super::{BitwiseSort, Sealed, Sort, SortKind};
use crate::{
    context::Context,
    error::SmtResult,
    node::{Ast, Node},
    ops::Coerce,
};

/// Booleans.
#[derive(Debug)]
pub enum Bool {}

impl Sealed for Bool {}

impl Sort for Bool {
    const KIND: SortKind = SortKind::Bool;
}

/// `and` and `or` are variadic in Z3, so two operands are packed into an array.
impl BitwiseSort for Bool {
    unsafe fn mk_and(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_and(ctx.z3(), 2, [a, b].as_ptr())
    }

    unsafe fn mk_or(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_or(ctx.z3(), 2, [a, b].as_ptr())
    }

    unsafe fn mk_xor(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
        Z3_mk_xor(ctx.z3(), a, b)
    }

    unsafe fn mk_not(ctx: &Context, a: Z3_ast) -> Z3_ast {
        Z3_mk_not(ctx.z3(), a)
    }
}

impl Context {
    /// A new Boolean constant named `name`.
    pub fn bool_const(&self, name: &str) -> SmtResult<Node<'_, Bool>> {
        self.named_const(name, |z3| unsafe { Z3_mk_bool_sort(z3) })
    }

    pub fn bool_val(&self, value: bool) -> Node<'_, Bool> {
        self.wrap_ast(|z3| unsafe {
            if value {
                Z3_mk_true(z3)
            } else {
                Z3_mk_false(z3)
            }
        })
    }

    /// Conjunction of all `args`. The empty conjunction is `true`.
    pub fn and<'ctx>(&'ctx self, args: &[Node<'ctx, Bool>]) -> Node<'ctx, Bool> {
        let args = raw_args(self, args);
        self.wrap_ast(|z3| unsafe { Z3_mk_and(z3, args.len() as u32, args.as_ptr()) })
    }

    /// Disjunction of all `args`. The empty disjunction is `false`.
    pub fn or<'ctx>(&'ctx self, args: &[Node<'ctx, Bool>]) -> Node<'ctx, Bool> {
        let args = raw_args(self, args);
        self.wrap_ast(|z3| unsafe { Z3_mk_or(z3, args.len() as u32, args.as_ptr()) })
    }
}

/// Collect the raw terms of `nodes` for a variadic Z3 call on `ctx`.
pub(crate) fn raw_args<'ctx, S: Sort>(ctx: &Context, nodes: &[Node<'ctx, S>]) -> Vec<Z3_ast> {
    nodes
        .iter()
        .map(|node| {
            ctx.claim(node.get_ctx());
            node.get_z3_ast()
        })
        .collect()
}

unsafe fn mk_implies(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
    Z3_mk_implies(ctx.z3(), a, b)
}

unsafe fn mk_iff(ctx: &Context, a: Z3_ast, b: Z3_ast) -> Z3_ast {
    Z3_mk_iff(ctx.z3(), a, b)
}

impl<'ctx> Node<'ctx, Bool> {
    pub fn implies(&self, rhs: impl Coerce<'ctx, Bool>) -> Node<'ctx, Bool> {
        let rhs = rhs.coerce(self);
        self.binary(&rhs, mk_implies)
    }

    pub fn iff(&self, rhs: impl Coerce<'ctx, Bool>) -> Node<'ctx, Bool> {
        let rhs = rhs.coerce(self);
        self.binary(&rhs, mk_iff)
    }

    /// If this node is `true`, then `then`, else `otherwise`. A literal
    /// `otherwise` takes the sort of `then`.
    pub fn ite<S: Sort>(
        &self,
        then: &Node<'ctx, S>,
        otherwise: impl Coerce<'ctx, S>,
    ) -> Node<'ctx, S> {
        let otherwise = otherwise.coerce(then);
        let ctx = self.get_ctx();
        ctx.claim(then.get_ctx());
        ctx.claim(otherwise.get_ctx());
        let (c, t, e) = (
            self.get_z3_ast(),
            then.get_z3_ast(),
            otherwise.get_z3_ast(),
        );
        ctx.wrap_ast(|z3| unsafe { Z3_mk_ite(z3, c, t, e) })
    }
}

#[cfg(test)]
mod test {
    use crate::{context::with_default_context, error::SmtError, node::Ast, sorts::SortKind};

    #[test]
    fn test_connectives() {
        with_default_context(|ctx| {
            let a = ctx.bool_const("a")?;
            let b = ctx.bool_const("b")?;
            assert_eq!(a.implies(&b).to_string(), "(=> a b)");
            assert_eq!(a.iff(true).to_string(), "(= a true)");
            assert_eq!(ctx.and(&[]).simplify().to_string(), "true");
            assert_eq!(ctx.or(&[]).simplify().to_string(), "false");
            assert_eq!(
                ctx.and(&[a.clone(), b.clone(), ctx.bool_val(true)]).to_string(),
                "(and a b true)"
            );
            assert_eq!(smt_or!(&a, &b).to_string(), "(or a b)");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_ite_takes_sort_of_then() {
        with_default_context(|ctx| {
            let c = ctx.bool_const("c")?;
            let x = ctx.bv_const("x", 16)?;
            let res = c.ite(&x, 0);
            assert_eq!(res.sort_kind(), SortKind::BitVec);
            assert_eq!(res.width(), 16);
            assert_eq!(res.to_string(), "(ite c x #x0000)");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_invalid_names() {
        with_default_context(|ctx| {
            assert!(matches!(ctx.bool_const(""), Err(SmtError::InvalidName(_))));
            assert!(matches!(
                ctx.bool_const("nul\0byte"),
                Err(SmtError::InvalidName(_))
            ));
            ctx.status()
        })
        .unwrap();
    }
}
