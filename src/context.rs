//! Lifecycle of the Z3 context and translation of Z3's errors.
//!
//! A [`Context`] is only ever created by [`with_context`], which guarantees
//! that the context is released on every exit path of the body, including
//! error propagation with `?` and panics. All nodes, solvers and models borrow
//! the context, so none of them can outlive it.
//!
//! Z3 reports errors through a callback. We install [`record_error`] on every
//! context, which stores the failing context and error code in a thread-local
//! slot. After each native call made through the context, the slot is checked.
//! The first error _poisons_ the context: later node-building calls are not
//! forwarded to Z3 anymore, and every fallible operation returns the recorded
//! [`SmtError::Library`].
//!
//! Terms of one context must never reach Z3 through another. Every operation
//! that combines a term with a context, a session or another term first
//! compares the contexts. A mismatch poisons the receiving context before any
//! native call is made.

use std::{
    cell::{Cell, RefCell},
    ffi::CString,
    fmt,
    time::Duration,
};

use tracing::{debug, warn};
use z3_sys::{
    ErrorCode, Z3_ast, Z3_context, Z3_dec_ref, Z3_del_config, Z3_del_context,
    Z3_get_error_msg, Z3_inc_ref, Z3_mk_config, Z3_mk_context_rc, Z3_mk_fpa_rne,
    Z3_set_error_handler, Z3_set_param_value,
};

use crate::{
    error::{SmtError, SmtResult},
    node::Node,
    params::{SessionParams, SmtParams},
    sorts::Sort,
    util::z3_string,
};

thread_local! {
    /// The last error reported by Z3 on this thread, with the address of the
    /// context it was reported for.
    static PENDING_ERROR: Cell<Option<(usize, ErrorCode)>> = Cell::new(None);
}

/// Error handler installed on every context. It must not unwind into Z3, so it
/// only records the error.
unsafe extern "C" fn record_error(ctx: Z3_context, code: ErrorCode) {
    let _ = PENDING_ERROR.try_with(|slot| slot.set(Some((ctx as usize, code))));
}

/// Configuration used to create a [`Context`].
///
/// Model generation is always enabled.
#[derive(Debug, Clone, Default)]
pub struct SmtConfig {
    params: SmtParams,
    timeout: Option<Duration>,
}

impl SmtConfig {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set a timeout for every check, with millisecond precision.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a Z3 parameter, e.g. `("smt.random_seed", "7")` or
    /// `("proof", "true")`. Context parameters go to the context
    /// configuration, all others to every solver and optimizer that accepts
    /// them (see [`crate::params`]). Unknown keys and ill-typed values make
    /// the context creation fail.
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.set_param(key, value);
        self
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn params(&self) -> &SmtParams {
        &self.params
    }

    /// All key-value pairs to be set on the Z3 config object.
    fn entries(&self) -> SmtResult<Vec<(CString, CString)>> {
        let fixed = |key: &str, value: String| -> SmtResult<(CString, CString)> {
            let c_key = CString::new(key).map_err(|_| SmtError::InvalidName(key.to_owned()))?;
            let c_value = CString::new(value).map_err(|_| SmtError::InvalidName(key.to_owned()))?;
            Ok((c_key, c_value))
        };
        let mut entries = vec![fixed("model", "true".to_owned())?];
        if let Some(timeout) = self.timeout {
            entries.push(fixed("timeout", timeout.as_millis().to_string())?);
        }
        entries.extend(
            self.params
                .context_entries()?
                .into_iter()
                .filter(|(key, _)| key.as_bytes() != b"model"),
        );
        Ok(entries)
    }
}

/// Owner of a Z3 context. See the [module documentation](self).
///
/// A context must only be used from the thread that created it.
pub struct Context {
    z3: Z3_context,
    /// Round-nearest-ties-to-even, created once and passed to every
    /// floating-point operation that needs a rounding mode.
    rounding_mode: Z3_ast,
    /// The first error Z3 reported for this context.
    poison: RefCell<Option<SmtError>>,
    /// Parameters handed to every new solver and optimizer.
    session_params: SessionParams,
}

impl Context {
    fn new(config: &SmtConfig) -> SmtResult<Context> {
        let entries = config.entries()?;
        let z3 = unsafe {
            let cfg = Z3_mk_config();
            for (key, value) in &entries {
                Z3_set_param_value(cfg, key.as_ptr(), value.as_ptr());
            }
            let z3 = Z3_mk_context_rc(cfg);
            Z3_del_config(cfg);
            z3
        };
        if z3.is_null() {
            return Err(SmtError::Library {
                code: ErrorCode::Exception,
                message: "could not create context".to_owned(),
            });
        }
        unsafe { Z3_set_error_handler(z3, Some(record_error)) };
        let mut ctx = Context {
            z3,
            rounding_mode: std::ptr::null_mut(),
            poison: RefCell::new(None),
            session_params: SessionParams::default(),
        };
        let rounding_mode = unsafe { Z3_mk_fpa_rne(z3) };
        ctx.collect_error();
        if !rounding_mode.is_null() && !ctx.is_poisoned() {
            unsafe { Z3_inc_ref(z3, rounding_mode) };
            ctx.rounding_mode = rounding_mode;
        }
        ctx.status()?;
        ctx.session_params = SessionParams::resolve(&ctx, &config.params)?;
        debug!(
            timeout = ?config.timeout,
            context_params = entries.len(),
            "created Z3 context"
        );
        Ok(ctx)
    }

    pub(crate) fn z3(&self) -> Z3_context {
        self.z3
    }

    pub(crate) fn rounding_mode(&self) -> Z3_ast {
        self.rounding_mode
    }

    pub(crate) fn session_params(&self) -> &SessionParams {
        &self.session_params
    }

    /// Poison this context unless `owner`, the context of a term about to be
    /// passed to Z3 through this one, is this context.
    pub(crate) fn claim(&self, owner: &Context) {
        if !std::ptr::eq(self, owner) {
            warn!("term of another context was used");
            self.poison_with(SmtError::Library {
                code: ErrorCode::InvalidArg,
                message: "term belongs to a different context".to_owned(),
            });
        }
    }

    /// Move an error recorded by the handler into this context's poison slot.
    fn collect_error(&self) {
        let pending = PENDING_ERROR
            .try_with(|slot| match slot.get() {
                Some((ctx, code)) if ctx == self.z3 as usize => {
                    slot.set(None);
                    Some(code)
                }
                _ => None,
            })
            .ok()
            .flatten();
        if let Some(code) = pending {
            let message = z3_string(unsafe { Z3_get_error_msg(self.z3, code) });
            warn!(?code, %message, "Z3 reported an error");
            self.poison_with(SmtError::Library { code, message });
        }
    }

    /// Record `err` unless an earlier error was recorded already.
    pub(crate) fn poison_with(&self, err: SmtError) {
        let mut poison = self.poison.borrow_mut();
        if poison.is_none() {
            *poison = Some(err);
        }
    }

    /// Whether Z3 reported an error for this context.
    pub fn is_poisoned(&self) -> bool {
        self.poison.borrow().is_some()
    }

    /// Return the first error Z3 reported for this context, if any.
    pub fn status(&self) -> SmtResult<()> {
        self.collect_error();
        match &*self.poison.borrow() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Run `build` to create a new AST and wrap the result in a [`Node`]. If
    /// the context is poisoned, Z3 is not called and a null node is returned.
    pub(crate) fn wrap_ast<S: Sort>(&self, build: impl FnOnce(Z3_context) -> Z3_ast) -> Node<'_, S> {
        if self.is_poisoned() {
            return Node::null(self);
        }
        let ast = build(self.z3);
        self.collect_error();
        if self.is_poisoned() {
            return Node::null(self);
        }
        if ast.is_null() {
            self.poison_with(SmtError::Library {
                code: ErrorCode::Exception,
                message: "Z3 returned a null term".to_owned(),
            });
            return Node::null(self);
        }
        unsafe { Z3_inc_ref(self.z3, ast) };
        Node::from_raw(self, ast)
    }

    /// Make a native call that does not build a node and surface any error
    /// that Z3 reported before or during the call.
    pub(crate) fn call<T>(&self, f: impl FnOnce(Z3_context) -> T) -> SmtResult<T> {
        self.status()?;
        let res = f(self.z3);
        self.status()?;
        Ok(res)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("poison", &self.poison.borrow())
            .finish_non_exhaustive()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        unsafe {
            if !self.rounding_mode.is_null() {
                Z3_dec_ref(self.z3, self.rounding_mode);
            }
            Z3_del_context(self.z3);
        }
        let z3 = self.z3 as usize;
        let _ = PENDING_ERROR.try_with(|slot| {
            if matches!(slot.get(), Some((ctx, _)) if ctx == z3) {
                slot.set(None);
            }
        });
        debug!("released Z3 context");
    }
}

/// Create a [`Context`] from `config`, run `body` with it and release the
/// context afterwards.
///
/// If `body` succeeds but Z3 reported an error on the context that `body` did
/// not observe, that error is returned instead of the body's value.
pub fn with_context<T>(
    config: &SmtConfig,
    body: impl FnOnce(&Context) -> SmtResult<T>,
) -> SmtResult<T> {
    let ctx = Context::new(config)?;
    let res = body(&ctx);
    let status = ctx.status();
    drop(ctx);
    let value = res?;
    status?;
    Ok(value)
}

/// [`with_context`] with the default [`SmtConfig`].
pub fn with_default_context<T>(body: impl FnOnce(&Context) -> SmtResult<T>) -> SmtResult<T> {
    with_context(&SmtConfig::default(), body)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use z3_sys::ErrorCode;

    use super::{with_context, with_default_context, SmtConfig};
    use crate::{
        error::SmtError,
        node::Ast,
        orders::{SmtEq, SmtPartialOrd},
        solver::{SatResult, Solver},
    };

    #[test]
    fn test_config_entries() {
        let config = SmtConfig::new()
            .timeout(Duration::from_millis(1500))
            .param("model", "false")
            .param("smt.random_seed", "3")
            .param("rlimit", "1000");
        let entries: Vec<(String, String)> = config
            .entries()
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.into_string().unwrap(), v.into_string().unwrap()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("model".to_owned(), "true".to_owned()),
                ("timeout".to_owned(), "1500".to_owned()),
                ("rlimit".to_owned(), "1000".to_owned()),
            ]
        );
    }

    #[test]
    fn test_body_value_is_returned() {
        let res = with_default_context(|ctx| {
            let x = ctx.int_const("x")?;
            Ok(x.to_string())
        });
        assert_eq!(res.unwrap(), "x");
    }

    #[test]
    fn test_body_error_is_propagated() {
        let res: Result<(), _> = with_default_context(|_ctx| Err(SmtError::EvalFailed));
        assert!(matches!(res, Err(SmtError::EvalFailed)));
    }

    #[test]
    fn test_library_error_poisons_context() {
        let res = with_default_context(|ctx| {
            let a = ctx.bv_const("a", 8)?;
            let b = ctx.bv_const("b", 16)?;
            // widths differ, which only Z3 can tell
            let sum = &a + &b;
            assert!(ctx.is_poisoned());
            assert!(sum.is_null());
            // later calls are not forwarded to Z3
            let eq = sum.smt_eq(&a);
            assert!(eq.is_null());
            Ok(())
        });
        assert!(matches!(res, Err(SmtError::Library { .. })));
    }

    #[test]
    fn test_contexts_are_independent() {
        let res = with_default_context(|outer| {
            let inner = with_default_context(|ctx| {
                let a = ctx.bv_const("a", 8)?;
                let b = ctx.bv_const("b", 4)?;
                let _ = a + b;
                Ok(())
            });
            assert!(inner.is_err());
            outer.status()?;
            outer.int_const("x").map(|_| ())
        });
        assert!(res.is_ok());
    }

    #[test]
    fn test_terms_of_another_context_are_rejected() {
        fn is_mismatch<T>(res: &Result<T, SmtError>) -> bool {
            matches!(res, Err(SmtError::Library { code: ErrorCode::InvalidArg, message })
                if message.contains("different context"))
        }
        with_default_context(|outer| {
            let x = outer.int_const("x")?;

            let res = with_default_context(|inner| {
                let y = inner.int_const("y")?;
                let sum = &y + &x;
                assert!(sum.is_null());
                assert!(inner.is_poisoned());
                Ok(())
            });
            assert!(is_mismatch(&res));

            let res = with_default_context(|inner| {
                let y = inner.int_const("y")?;
                Ok(y.smt_eq(&x).is_null())
            });
            assert!(is_mismatch(&res));

            let res = with_default_context(|inner| {
                let mut solver = Solver::new(inner)?;
                solver.assert(&x.gt(0))
            });
            assert!(is_mismatch(&res));

            let res = with_default_context(|inner| {
                let mut solver = Solver::new(inner)?;
                solver.check_model(|model| model.eval_int(&x))
            });
            assert!(is_mismatch(&res));

            let res = with_default_context(|inner| {
                let y = inner.int_const("y")?;
                Ok(inner.forall(&[&y as &dyn Ast], &x.gt(0)).is_null())
            });
            assert!(is_mismatch(&res));

            let res = with_default_context(|inner| Ok(inner.add(&[x.clone()]).is_null()));
            assert!(is_mismatch(&res));

            // the outer context is untouched by all of the above
            assert!(!outer.is_poisoned());
            let mut solver = Solver::new(outer)?;
            solver.assert(&x.gt(0))?;
            assert_eq!(solver.check()?, SatResult::Sat);
            Ok(())
        })
        .unwrap();
    }
}
