use std::borrow::Cow;

use z3_sys::{
    ErrorCode, Z3_app, Z3_get_app_num_args, Z3_is_app, Z3_mk_quantifier_const_ex,
    Z3_mk_string_symbol, Z3_to_app,
};

use crate::{
    context::Context,
    error::SmtError,
    node::{Ast, Node},
    sorts::Bool,
    util::symbol_name,
};

/// Weights for quantifiers.
///
/// The weights are used to prioritize quantifier instantiation in the SMT solver.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Weight(pub u32);

impl Weight {
    /// Default weight for quantifiers.
    pub const DEFAULT: Weight = Weight(1);
}

impl Default for Weight {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Metadata to create quantifiers.
#[derive(Debug, Clone, Default)]
pub struct QuantifierMeta {
    /// A user-given name for the quantifier.
    pub user_name: String,
    /// Whether to use the MBQI prefix (to enable MBQI with Z3's `smt.mbqi.id`
    /// option).
    pub mbqi: bool,
    /// A suffix for a variant of the same quantifier.
    pub variant: Option<Cow<'static, str>>,
    /// The weight of the quantifier.
    pub weight: Weight,
}

impl QuantifierMeta {
    /// The prefix for the quantifier ID when MBQI should be enabled.
    pub const MBQI_PREFIX: &'static str = "mbqi_";

    /// Create a new quantifier metadata with the given user name.
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            ..Default::default()
        }
    }

    pub fn weight(self, weight: Weight) -> Self {
        Self { weight, ..self }
    }

    pub fn variant(&self, variant: Cow<'static, str>) -> Self {
        Self {
            variant: Some(variant),
            ..self.clone()
        }
    }

    /// Generate the quantifier ID based on the metadata.
    pub fn qid(&self) -> String {
        let mut qid = String::new();
        if self.mbqi {
            qid.push_str(Self::MBQI_PREFIX);
        }
        qid.push_str(&self.user_name);
        if let Some(ref variant) = self.variant {
            qid.push('_');
            qid.push_str(variant);
        }
        qid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierType {
    Forall,
    Exists,
}

impl Context {
    /// Universally quantify `body` over the constants in `bounds`.
    pub fn forall<'ctx>(
        &'ctx self,
        bounds: &[&dyn Ast<'ctx>],
        body: &Node<'ctx, Bool>,
    ) -> Node<'ctx, Bool> {
        self.mk_quantifier(&QuantifierMeta::default(), QuantifierType::Forall, bounds, body)
    }

    /// Existentially quantify `body` over the constants in `bounds`.
    pub fn exists<'ctx>(
        &'ctx self,
        bounds: &[&dyn Ast<'ctx>],
        body: &Node<'ctx, Bool>,
    ) -> Node<'ctx, Bool> {
        self.mk_quantifier(&QuantifierMeta::default(), QuantifierType::Exists, bounds, body)
    }

    /// [`Context::forall`] with a name and weight from `meta`.
    pub fn forall_with<'ctx>(
        &'ctx self,
        meta: &QuantifierMeta,
        bounds: &[&dyn Ast<'ctx>],
        body: &Node<'ctx, Bool>,
    ) -> Node<'ctx, Bool> {
        self.mk_quantifier(meta, QuantifierType::Forall, bounds, body)
    }

    /// Create a quantifier with the given metadata, bounds, and body. Each
    /// bound must be a constant. Without bounds, `body` is returned as is.
    pub fn mk_quantifier<'ctx>(
        &'ctx self,
        meta: &QuantifierMeta,
        typ: QuantifierType,
        bounds: &[&dyn Ast<'ctx>],
        body: &Node<'ctx, Bool>,
    ) -> Node<'ctx, Bool> {
        self.claim(body.get_ctx());
        for bound in bounds {
            self.claim(bound.get_ctx());
        }
        if self.is_poisoned() {
            return Node::null(self);
        }
        if bounds.is_empty() {
            return body.clone();
        }
        let quantifier_id = match symbol_name(&meta.qid()) {
            Ok(qid) => Some(qid),
            // anonymous quantifiers get an ID from Z3
            Err(_) if meta.qid().is_empty() => None,
            Err(err) => {
                self.poison_with(err);
                return Node::null(self);
            }
        };
        let is_forall = typ == QuantifierType::Forall;
        let weight = meta.weight.0;
        let bounds: Vec<_> = bounds.iter().map(|bound| bound.get_z3_ast()).collect();
        let body = body.get_z3_ast();
        self.wrap_ast(|z3| unsafe {
            let mut apps: Vec<Z3_app> = Vec::with_capacity(bounds.len());
            for &bound in &bounds {
                if !Z3_is_app(z3, bound) || Z3_get_app_num_args(z3, Z3_to_app(z3, bound)) != 0 {
                    self.poison_with(SmtError::Library {
                        code: ErrorCode::InvalidArg,
                        message: "quantifier bound is not a constant".to_owned(),
                    });
                    return std::ptr::null_mut();
                }
                apps.push(Z3_to_app(z3, bound));
            }
            let quantifier_id = match &quantifier_id {
                Some(qid) => Z3_mk_string_symbol(z3, qid.as_ptr()),
                None => std::ptr::null_mut(),
            };
            Z3_mk_quantifier_const_ex(
                z3,
                is_forall,
                weight,
                quantifier_id,
                std::ptr::null_mut(),
                apps.len() as u32,
                apps.as_ptr(),
                0,
                std::ptr::null(),
                0,
                std::ptr::null(),
                body,
            )
        })
    }
}

#[cfg(test)]
mod test {
    use std::borrow::Cow;

    use super::{QuantifierMeta, Weight};
    use crate::{
        context::with_default_context,
        error::SmtError,
        node::Ast,
        orders::{SmtEq, SmtPartialOrd},
        solver::{SatResult, Solver},
    };

    #[test]
    fn test_qid() {
        let meta = QuantifierMeta::new("sum_comm");
        assert_eq!(meta.qid(), "sum_comm");
        let mut meta = meta.variant(Cow::Borrowed("left"));
        meta.mbqi = true;
        assert_eq!(meta.qid(), "mbqi_sum_comm_left");
        assert_eq!(QuantifierMeta::default().weight, Weight::DEFAULT);
    }

    #[test]
    fn test_forall_is_valid() {
        with_default_context(|ctx| {
            let x = ctx.int_const("x")?;
            let y = ctx.int_const("y")?;
            let comm = (&x + &y).smt_eq(&y + &x);
            let meta = QuantifierMeta::new("add_comm").weight(Weight(3));
            let forall = ctx.forall_with(&meta, &[&x, &y], &comm);
            assert!(forall.to_string().starts_with("(forall ((x Int) (y Int))"));

            let mut solver = Solver::new(ctx)?;
            solver.assert(&!forall)?;
            assert_eq!(solver.check()?, SatResult::Unsat);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_exists_over_mixed_sorts() {
        with_default_context(|ctx| {
            let x = ctx.int_const("x")?;
            let b = ctx.bool_const("b")?;
            let c = ctx.bool_const("c")?;
            let body = b.ite(&x, 0).gt(5) & b.iff(&c);
            let exists = ctx.exists(&[&x as &dyn Ast, &b], &body);

            let mut solver = Solver::new(ctx)?;
            solver.assert(&exists)?;
            solver.assert(&!ctx.exists(&[&x], &x.lt(&x)))?;
            solver.check_model(|model| {
                assert!(model.eval_bool(&c)?);
                Ok(())
            })
        })
        .unwrap();
    }

    #[test]
    fn test_bound_must_be_constant() {
        let res = with_default_context(|ctx| {
            let x = ctx.int_const("x")?;
            let sum = &x + 1;
            let forall = ctx.forall(&[&sum], &x.ge(0));
            assert!(forall.is_null());
            Ok(())
        });
        assert!(matches!(res, Err(SmtError::Library { .. })));
    }
}
