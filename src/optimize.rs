//! Optimization modulo theories.
//!
//! An [`Optimizer`] is like a [`crate::Solver`] without backtracking frames,
//! but with objectives. Several objectives may be registered; how they are
//! combined (lexicographically by default) is decided by Z3's `opt.priority`
//! parameter.

use std::{
    fmt::{self, Display, Formatter},
    marker::PhantomData,
    time::{Duration, Instant},
};

use tracing::{debug, info_span};
use z3_sys::{
    Z3_mk_optimize, Z3_optimize, Z3_optimize_assert, Z3_optimize_check, Z3_optimize_dec_ref,
    Z3_optimize_get_lower, Z3_optimize_get_model, Z3_optimize_get_reason_unknown,
    Z3_optimize_get_upper, Z3_optimize_inc_ref, Z3_optimize_maximize, Z3_optimize_minimize,
    Z3_optimize_set_params, Z3_optimize_to_string,
};

use crate::{
    context::Context,
    error::{SmtError, SmtResult},
    model::Model,
    node::{Ast, Node},
    solver::{null_handle, timeout_params, SatResult},
    sorts::{Bool, OptimizeSort, Sort},
    util::{z3_string, ReasonUnknown},
};

/// Handle to an objective registered with [`Optimizer::minimize`] or
/// [`Optimizer::maximize`].
#[derive(Debug)]
pub struct Objective<S> {
    index: u32,
    _sort: PhantomData<S>,
}

impl<S> Objective<S> {
    /// Position of this objective in registration order.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl<S> Clone for Objective<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Objective<S> {}

/// A Z3 optimizer.
pub struct Optimizer<'ctx> {
    ctx: &'ctx Context,
    optimize: Z3_optimize,
    last_result: Option<SatResult>,
}

impl<'ctx> Optimizer<'ctx> {
    pub fn new(ctx: &'ctx Context) -> SmtResult<Self> {
        let optimize = ctx.call(|z3| unsafe { Z3_mk_optimize(z3) })?;
        if optimize.is_null() {
            return Err(null_handle("optimizer"));
        }
        ctx.call(|z3| unsafe { Z3_optimize_inc_ref(z3, optimize) })?;
        let optimizer = Optimizer {
            ctx,
            optimize,
            last_result: None,
        };
        if !ctx.session_params().is_empty() {
            ctx.session_params()
                .for_optimizer(ctx)?
                .apply(|z3, params| unsafe { Z3_optimize_set_params(z3, optimize, params) })?;
        }
        Ok(optimizer)
    }

    pub fn get_context(&self) -> &'ctx Context {
        self.ctx
    }

    /// Add a hard constraint.
    pub fn assert(&mut self, value: &Node<'ctx, Bool>) -> SmtResult<()> {
        let (optimize, ast) = (self.optimize, value.get_z3_ast());
        self.last_result = None;
        self.ctx.claim(value.get_ctx());
        self.ctx
            .call(|z3| unsafe { Z3_optimize_assert(z3, optimize, ast) })
    }

    pub fn minimize<S: OptimizeSort>(&mut self, value: &Node<'ctx, S>) -> SmtResult<Objective<S>> {
        self.add_objective(value, |z3, optimize, ast| unsafe {
            Z3_optimize_minimize(z3, optimize, ast)
        })
    }

    pub fn maximize<S: OptimizeSort>(&mut self, value: &Node<'ctx, S>) -> SmtResult<Objective<S>> {
        self.add_objective(value, |z3, optimize, ast| unsafe {
            Z3_optimize_maximize(z3, optimize, ast)
        })
    }

    /// Errors that happened before the registration are returned as they
    /// are. Errors of the registration itself are wrapped in
    /// [`SmtError::ObjectiveRejected`].
    fn add_objective<S: Sort>(
        &mut self,
        value: &Node<'ctx, S>,
        register: impl FnOnce(z3_sys::Z3_context, Z3_optimize, z3_sys::Z3_ast) -> u32,
    ) -> SmtResult<Objective<S>> {
        self.ctx.claim(value.get_ctx());
        self.ctx.status()?;
        let (optimize, ast) = (self.optimize, value.get_z3_ast());
        self.last_result = None;
        let index = self
            .ctx
            .call(|z3| register(z3, optimize, ast))
            .map_err(|err| SmtError::ObjectiveRejected(Box::new(err)))?;
        debug!(index, objective = %value, "registered objective");
        Ok(Objective {
            index,
            _sort: PhantomData,
        })
    }

    /// Check the assertions and optimize the objectives. The result is cached
    /// until the assertions or objectives change.
    pub fn check(&mut self) -> SmtResult<SatResult> {
        if let Some(res) = self.last_result {
            return Ok(res);
        }
        let optimize = self.optimize;
        let _span = info_span!("optimizer_check").entered();
        let start = Instant::now();
        let res = self
            .ctx
            .call(|z3| unsafe { Z3_optimize_check(z3, optimize, 0, std::ptr::null()) })
            .map(SatResult::from_lbool)?;
        debug!(result = %res, elapsed = ?start.elapsed(), "optimizer check");
        self.last_result = Some(res);
        Ok(res)
    }

    /// Retrieve the optimal model of the last check. Only available if the
    /// last check returned [`SatResult::Sat`] and nothing changed since.
    pub fn get_model(&self) -> SmtResult<Model<'_, 'ctx>> {
        if self.last_result != Some(SatResult::Sat) {
            return Err(SmtError::ModelUnavailable);
        }
        let optimize = self.optimize;
        let model = self
            .ctx
            .call(|z3| unsafe { Z3_optimize_get_model(z3, optimize) })?;
        Model::new(self.ctx, model)
    }

    /// See [`crate::Solver::check_model`].
    pub fn check_model<T>(
        &mut self,
        body: impl FnOnce(&Model<'_, 'ctx>) -> SmtResult<T>,
    ) -> SmtResult<T> {
        match self.check()? {
            SatResult::Sat => {
                let model = self.get_model()?;
                body(&model)
            }
            SatResult::Unsat => Err(SmtError::Unsat),
            SatResult::Unknown => Err(SmtError::Unknown(self.get_reason_unknown()?)),
        }
    }

    /// Lower bound of `objective` after the last check. May mention
    /// infinity and epsilon terms if the objective is unbounded.
    pub fn lower<S: Sort>(&self, objective: Objective<S>) -> SmtResult<Node<'ctx, S>> {
        self.bound(objective, Z3_optimize_get_lower)
    }

    /// Upper bound of `objective` after the last check.
    pub fn upper<S: Sort>(&self, objective: Objective<S>) -> SmtResult<Node<'ctx, S>> {
        self.bound(objective, Z3_optimize_get_upper)
    }

    fn bound<S: Sort>(
        &self,
        objective: Objective<S>,
        get: unsafe extern "C" fn(z3_sys::Z3_context, Z3_optimize, u32) -> z3_sys::Z3_ast,
    ) -> SmtResult<Node<'ctx, S>> {
        if self.last_result.is_none() {
            return Err(SmtError::ModelUnavailable);
        }
        let optimize = self.optimize;
        let node = self
            .ctx
            .wrap_ast(|z3| unsafe { get(z3, optimize, objective.index) });
        self.ctx.status()?;
        Ok(node)
    }

    pub fn get_reason_unknown(&self) -> SmtResult<ReasonUnknown> {
        let optimize = self.optimize;
        let reason = self
            .ctx
            .call(|z3| unsafe { z3_string(Z3_optimize_get_reason_unknown(z3, optimize)) })?;
        Ok(reason
            .parse()
            .unwrap_or_else(|_| ReasonUnknown::Other(reason.clone())))
    }

    /// Set a timeout for every `check` call.
    pub fn set_timeout(&mut self, timeout: Duration) -> SmtResult<()> {
        let optimize = self.optimize;
        self.last_result = None;
        timeout_params(self.ctx, timeout)?
            .apply(|z3, params| unsafe { Z3_optimize_set_params(z3, optimize, params) })
    }
}

impl<'ctx> Display for Optimizer<'ctx> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = z3_string(unsafe { Z3_optimize_to_string(self.ctx.z3(), self.optimize) });
        f.write_str(&s)
    }
}

impl<'ctx> fmt::Debug for Optimizer<'ctx> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Optimizer")
            .field("last_result", &self.last_result)
            .finish_non_exhaustive()
    }
}

impl<'ctx> Drop for Optimizer<'ctx> {
    fn drop(&mut self) {
        unsafe { Z3_optimize_dec_ref(self.ctx.z3(), self.optimize) };
    }
}
