//! The sort-tagged term handle.

use std::{
    fmt::{self, Debug, Display, Formatter},
    marker::PhantomData,
};

use z3_sys::{
    Z3_ast, Z3_ast_to_string, Z3_dec_ref, Z3_get_sort, Z3_inc_ref, Z3_simplify, Z3_sort,
};

use crate::{
    context::Context,
    sorts::{BinaryFn, Sort, SortKind, UnaryFn},
    util::z3_string,
};

/// Access to the raw Z3 term behind a value, independent of its sort.
///
/// This is what sort-erased APIs like [`Context::forall`] take.
pub trait Ast<'ctx> {
    fn get_ctx(&self) -> &'ctx Context;

    fn get_z3_ast(&self) -> Z3_ast;

    fn sort_kind(&self) -> SortKind;
}

/// An immutable Z3 term of sort `S`.
///
/// Nodes are reference-counted handles into the context's term graph, so
/// cloning is cheap. A node is _null_ if it was built after Z3 reported an
/// error on its context (see [`crate::context`]).
pub struct Node<'ctx, S> {
    ctx: &'ctx Context,
    ast: Z3_ast,
    _sort: PhantomData<S>,
}

impl<'ctx, S: Sort> Node<'ctx, S> {
    /// Take ownership of one reference to `ast`. The caller must already have
    /// incremented the reference count.
    pub(crate) fn from_raw(ctx: &'ctx Context, ast: Z3_ast) -> Self {
        Node {
            ctx,
            ast,
            _sort: PhantomData,
        }
    }

    pub(crate) fn null(ctx: &'ctx Context) -> Self {
        Self::from_raw(ctx, std::ptr::null_mut())
    }

    /// Whether this node stands in for a term Z3 refused to build.
    pub fn is_null(&self) -> bool {
        self.ast.is_null()
    }

    pub fn get_ctx(&self) -> &'ctx Context {
        self.ctx
    }

    /// The raw Z3 sort of this term. Only valid on non-null nodes.
    pub(crate) unsafe fn z3_sort(&self) -> Z3_sort {
        Z3_get_sort(self.ctx.z3(), self.ast)
    }

    pub(crate) fn unary<T: Sort>(&self, f: UnaryFn) -> Node<'ctx, T> {
        let a = self.ast;
        let ctx = self.ctx;
        ctx.wrap_ast(|_| unsafe { f(ctx, a) })
    }

    pub(crate) fn binary<T: Sort>(&self, rhs: &Node<'ctx, S>, f: BinaryFn) -> Node<'ctx, T> {
        let (a, b) = (self.ast, rhs.ast);
        let ctx = self.ctx;
        ctx.claim(rhs.ctx);
        ctx.wrap_ast(|_| unsafe { f(ctx, a, b) })
    }

    /// Apply Z3's simplifier. Comparisons of literals reduce to `true` or
    /// `false`, arithmetic on literals to a literal.
    pub fn simplify(&self) -> Self {
        let a = self.ast;
        self.ctx.wrap_ast(|z3| unsafe { Z3_simplify(z3, a) })
    }
}

impl<'ctx, S: Sort> Ast<'ctx> for Node<'ctx, S> {
    fn get_ctx(&self) -> &'ctx Context {
        self.ctx
    }

    fn get_z3_ast(&self) -> Z3_ast {
        self.ast
    }

    fn sort_kind(&self) -> SortKind {
        S::KIND
    }
}

impl<'ctx, S> Clone for Node<'ctx, S> {
    fn clone(&self) -> Self {
        if !self.ast.is_null() {
            unsafe { Z3_inc_ref(self.ctx.z3(), self.ast) };
        }
        Node {
            ctx: self.ctx,
            ast: self.ast,
            _sort: PhantomData,
        }
    }
}

impl<'ctx, S> Drop for Node<'ctx, S> {
    fn drop(&mut self) {
        if !self.ast.is_null() {
            unsafe { Z3_dec_ref(self.ctx.z3(), self.ast) };
        }
    }
}

impl<'ctx, S> Display for Node<'ctx, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.ast.is_null() {
            return f.write_str("<error>");
        }
        let s = z3_string(unsafe { Z3_ast_to_string(self.ctx.z3(), self.ast) });
        f.write_str(&s)
    }
}

impl<'ctx, S: Sort> Debug for Node<'ctx, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Node")
            .field(&S::KIND)
            .field(&format_args!("{}", self))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use crate::{context::with_default_context, node::Ast, sorts::SortKind};

    #[test]
    fn test_display_and_kind() {
        with_default_context(|ctx| {
            let x = ctx.int_const("x")?;
            let b = ctx.bool_const("b")?;
            assert_eq!(x.to_string(), "x");
            assert_eq!(x.sort_kind(), SortKind::Int);
            assert_eq!(b.sort_kind(), SortKind::Bool);
            assert_eq!(format!("{:?}", b), "Node(Bool, b)");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_clone_shares_term() {
        with_default_context(|ctx| {
            let x = ctx.int_const("x")?;
            let y = x.clone();
            drop(x);
            assert!(!y.get_z3_ast().is_null());
            assert_eq!((&y + 1).to_string(), "(+ x 1)");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_simplify_literals() {
        with_default_context(|ctx| {
            let sum = ctx.int_val(2) + 3;
            assert_eq!(sum.simplify().to_string(), "5");
            Ok(())
        })
        .unwrap();
    }
}
