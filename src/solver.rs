//! Satisfiability checks with scoped backtracking.

use std::{
    ffi::CString,
    fmt::{self, Display, Formatter},
    time::{Duration, Instant},
};

use tracing::{debug, info_span, trace};
use z3_sys::{
    ErrorCode, Z3_ast_vector_dec_ref, Z3_ast_vector_get, Z3_ast_vector_inc_ref,
    Z3_ast_vector_size, Z3_inc_ref, Z3_lbool, Z3_mk_solver, Z3_solver, Z3_solver_assert,
    Z3_solver_check, Z3_solver_dec_ref, Z3_solver_get_assertions, Z3_solver_get_model,
    Z3_solver_get_reason_unknown, Z3_solver_inc_ref, Z3_solver_pop, Z3_solver_push,
    Z3_solver_set_params, Z3_solver_to_string,
};

use crate::{
    context::Context,
    error::{SmtError, SmtResult},
    model::Model,
    node::{Ast, Node},
    params::{ParamSet, ParamValue},
    sorts::Bool,
    util::{z3_string, ReasonUnknown},
};

/// Result of a satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

impl SatResult {
    pub(crate) fn from_lbool(value: Z3_lbool) -> Self {
        match value {
            z3_sys::Z3_L_TRUE => SatResult::Sat,
            z3_sys::Z3_L_FALSE => SatResult::Unsat,
            z3_sys::Z3_L_UNDEF => SatResult::Unknown,
            other => unreachable!("invalid Z3_lbool value {}", other),
        }
    }
}

impl Display for SatResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SatResult::Sat => f.write_str("sat"),
            SatResult::Unsat => f.write_str("unsat"),
            SatResult::Unknown => f.write_str("unknown"),
        }
    }
}

/// Error for a native constructor that returned null without reporting an
/// error through the handler.
pub(crate) fn null_handle(what: &str) -> SmtError {
    SmtError::Library {
        code: ErrorCode::Exception,
        message: format!("could not create {}", what),
    }
}

/// A parameter set with a single `timeout` entry in milliseconds.
pub(crate) fn timeout_params(ctx: &Context, timeout: Duration) -> SmtResult<ParamSet<'_>> {
    let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
    let name = CString::new("timeout").map_err(|_| SmtError::InvalidName("timeout".to_owned()))?;
    let mut params = ParamSet::new(ctx)?;
    params.set(&name, &ParamValue::UInt(millis))?;
    Ok(params)
}

/// A Z3 solver.
///
/// All state-changing operations take `&mut self`, which rules out a
/// [`Model`] outliving a change of the assertions.
pub struct Solver<'ctx> {
    ctx: &'ctx Context,
    solver: Z3_solver,
    /// Number of open [`Solver::push`] frames.
    level: usize,
    /// The result of the last check. It is reset any time the assertions on
    /// the solver are modified.
    last_result: Option<SatResult>,
}

impl<'ctx> Solver<'ctx> {
    pub fn new(ctx: &'ctx Context) -> SmtResult<Self> {
        let solver = ctx.call(|z3| unsafe { Z3_mk_solver(z3) })?;
        if solver.is_null() {
            return Err(null_handle("solver"));
        }
        ctx.call(|z3| unsafe { Z3_solver_inc_ref(z3, solver) })?;
        let solver = Solver {
            ctx,
            solver,
            level: 0,
            last_result: None,
        };
        if !ctx.session_params().is_empty() {
            let raw = solver.solver;
            ctx.session_params()
                .for_solver(ctx)?
                .apply(|z3, params| unsafe { Z3_solver_set_params(z3, raw, params) })?;
        }
        Ok(solver)
    }

    pub fn get_context(&self) -> &'ctx Context {
        self.ctx
    }

    /// Add a hard constraint.
    pub fn assert(&mut self, value: &Node<'ctx, Bool>) -> SmtResult<()> {
        let (solver, ast) = (self.solver, value.get_z3_ast());
        self.last_result = None;
        self.ctx.claim(value.get_ctx());
        self.ctx
            .call(|z3| unsafe { Z3_solver_assert(z3, solver, ast) })
    }

    /// Open a backtracking frame, run `body` and close the frame again. All
    /// assertions made by `body` are removed afterwards. The frame is closed
    /// on every exit path of `body`, including panics.
    pub fn push<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        let mut frame = Frame::open(self);
        body(&mut *frame.solver)
    }

    /// Retrieve the current number of open frames.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Check the assertions. The result is cached until the assertions change.
    pub fn check(&mut self) -> SmtResult<SatResult> {
        if let Some(res) = self.last_result {
            return Ok(res);
        }
        let solver = self.solver;
        let _span = info_span!("solver_check").entered();
        let start = Instant::now();
        let res = self
            .ctx
            .call(|z3| unsafe { Z3_solver_check(z3, solver) })
            .map(SatResult::from_lbool)?;
        debug!(result = %res, elapsed = ?start.elapsed(), level = self.level, "solver check");
        self.last_result = Some(res);
        Ok(res)
    }

    /// Retrieve the model of the last check. Only available if the last
    /// check returned [`SatResult::Sat`] and nothing changed since.
    pub fn get_model(&self) -> SmtResult<Model<'_, 'ctx>> {
        if self.last_result != Some(SatResult::Sat) {
            return Err(SmtError::ModelUnavailable);
        }
        let solver = self.solver;
        let model = self
            .ctx
            .call(|z3| unsafe { Z3_solver_get_model(z3, solver) })?;
        Model::new(self.ctx, model)
    }

    /// Check the assertions and run `body` with the model if they are
    /// satisfiable. Otherwise, `body` is not run and [`SmtError::Unsat`] or
    /// [`SmtError::Unknown`] is returned.
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

    /// Get all assertions currently on the solver.
    pub fn get_assertions(&self) -> SmtResult<Vec<Node<'ctx, Bool>>> {
        let solver = self.solver;
        let ctx = self.ctx;
        ctx.call(|z3| unsafe {
            let vector = Z3_solver_get_assertions(z3, solver);
            Z3_ast_vector_inc_ref(z3, vector);
            let assertions: Vec<Node<'ctx, Bool>> = (0..Z3_ast_vector_size(z3, vector))
                .map(|i| {
                    let ast = Z3_ast_vector_get(z3, vector, i);
                    Z3_inc_ref(z3, ast);
                    Node::from_raw(ctx, ast)
                })
                .collect();
            Z3_ast_vector_dec_ref(z3, vector);
            assertions
        })
    }

    /// Why the last check returned [`SatResult::Unknown`].
    pub fn get_reason_unknown(&self) -> SmtResult<ReasonUnknown> {
        let solver = self.solver;
        let reason = self
            .ctx
            .call(|z3| unsafe { z3_string(Z3_solver_get_reason_unknown(z3, solver)) })?;
        Ok(reason
            .parse()
            .unwrap_or_else(|_| ReasonUnknown::Other(reason.clone())))
    }

    /// Set a timeout for every `check` call.
    pub fn set_timeout(&mut self, timeout: Duration) -> SmtResult<()> {
        let solver = self.solver;
        self.last_result = None;
        timeout_params(self.ctx, timeout)?
            .apply(|z3, params| unsafe { Z3_solver_set_params(z3, solver, params) })
    }
}

/// An open backtracking frame. Dropping it pops the frame.
struct Frame<'a, 'ctx> {
    solver: &'a mut Solver<'ctx>,
    pushed: bool,
}

impl<'a, 'ctx> Frame<'a, 'ctx> {
    fn open(solver: &'a mut Solver<'ctx>) -> Self {
        let raw = solver.solver;
        let pushed = solver
            .ctx
            .call(|z3| unsafe { Z3_solver_push(z3, raw) })
            .is_ok();
        solver.level += 1;
        trace!(level = solver.level, "push");
        Frame { solver, pushed }
    }
}

impl<'a, 'ctx> Drop for Frame<'a, 'ctx> {
    fn drop(&mut self) {
        let raw = self.solver.solver;
        if self.pushed {
            // a failure here poisons the context and is reported by its next
            // fallible operation
            let _ = self
                .solver
                .ctx
                .call(|z3| unsafe { Z3_solver_pop(z3, raw, 1) });
        }
        self.solver.level -= 1;
        self.solver.last_result = None;
        trace!(level = self.solver.level, "pop");
    }
}

impl<'ctx> Display for Solver<'ctx> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = z3_string(unsafe { Z3_solver_to_string(self.ctx.z3(), self.solver) });
        f.write_str(&s)
    }
}

impl<'ctx> fmt::Debug for Solver<'ctx> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("level", &self.level)
            .field("last_result", &self.last_result)
            .finish_non_exhaustive()
    }
}

impl<'ctx> Drop for Solver<'ctx> {
    fn drop(&mut self) {
        unsafe { Z3_solver_dec_ref(self.ctx.z3(), self.solver) };
    }
}
